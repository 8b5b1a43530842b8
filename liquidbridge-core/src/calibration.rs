//! Fan duty calibration table
//!
//! liquidctl never reports a fan duty percentage directly, so the duty is
//! estimated from the observed fan RPM using an empirical characterization
//! table. The table is a static array sorted ascending by RPM; lookup is a
//! binary search followed by a nearest-neighbor comparison.

/// One calibration point mapping an observed RPM to a duty percentage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalibrationPoint {
    /// Observed fan RPM
    pub rpm: u32,
    /// Estimated duty percentage (20-100)
    pub percent: u8,
}

const fn point(rpm: u32, percent: u8) -> CalibrationPoint {
    CalibrationPoint { rpm, percent }
}

/// Highest characterized RPM; anything at or above saturates to 100%
pub const MAX_RPM: u32 = 1980;

/// Empirical RPM-to-duty characterization, sorted ascending by RPM.
///
/// Both columns are strictly increasing, which the tests assert.
pub const RPM_TABLE: [CalibrationPoint; 81] = [
    point(520, 20),
    point(521, 21),
    point(522, 22),
    point(523, 23),
    point(524, 24),
    point(525, 25),
    point(526, 26),
    point(527, 27),
    point(528, 28),
    point(529, 29),
    point(530, 30),
    point(532, 31),
    point(534, 32),
    point(536, 33),
    point(538, 34),
    point(540, 35),
    point(542, 36),
    point(544, 37),
    point(546, 38),
    point(548, 39),
    point(550, 40),
    point(571, 41),
    point(592, 42),
    point(613, 43),
    point(634, 44),
    point(655, 45),
    point(676, 46),
    point(697, 47),
    point(718, 48),
    point(739, 49),
    point(760, 50),
    point(781, 51),
    point(802, 52),
    point(823, 53),
    point(844, 54),
    point(865, 55),
    point(886, 56),
    point(907, 57),
    point(928, 58),
    point(949, 59),
    point(970, 60),
    point(989, 61),
    point(1008, 62),
    point(1027, 63),
    point(1046, 64),
    point(1065, 65),
    point(1084, 66),
    point(1103, 67),
    point(1122, 68),
    point(1141, 69),
    point(1160, 70),
    point(1180, 71),
    point(1200, 72),
    point(1220, 73),
    point(1240, 74),
    point(1260, 75),
    point(1280, 76),
    point(1300, 77),
    point(1320, 78),
    point(1340, 79),
    point(1360, 80),
    point(1377, 81),
    point(1394, 82),
    point(1411, 83),
    point(1428, 84),
    point(1445, 85),
    point(1462, 86),
    point(1479, 87),
    point(1496, 88),
    point(1513, 89),
    point(1530, 90),
    point(1550, 91),
    point(1570, 92),
    point(1590, 93),
    point(1610, 94),
    point(1630, 95),
    point(1650, 96),
    point(1670, 97),
    point(1690, 98),
    point(1720, 99),
    point(MAX_RPM, 100),
];

/// Estimate a duty percentage from an observed fan RPM.
///
/// - At or above [`MAX_RPM`] the estimate saturates to 100
/// - Below the lowest characterized RPM, the lowest percent is returned
/// - Otherwise the nearest table entry by absolute distance wins; exact
///   ties resolve to the lower-RPM entry
pub fn duty_from_rpm(rpm: f64) -> u8 {
    let first = RPM_TABLE[0];
    let last = RPM_TABLE[RPM_TABLE.len() - 1];

    if rpm >= last.rpm as f64 {
        return last.percent;
    }
    if rpm <= first.rpm as f64 {
        return first.percent;
    }

    // Index of the first entry with entry.rpm >= rpm; the nearest match
    // is either that entry or its predecessor.
    let idx = RPM_TABLE.partition_point(|p| (p.rpm as f64) < rpm);
    let above = RPM_TABLE[idx];
    let below = RPM_TABLE[idx - 1];

    let dist_above = above.rpm as f64 - rpm;
    let dist_below = rpm - below.rpm as f64;

    if dist_below <= dist_above {
        below.percent
    } else {
        above.percent
    }
}
