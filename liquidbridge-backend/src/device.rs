//! Per-device facade of typed sensors and controls
//!
//! A `Device` is built once from a status record: each fixed key family
//! (liquid temperature, pump speed, pump duty, fan N speed) is tested for
//! presence (key exists with a non-null value) and the corresponding child
//! entity materialized only if present. Presence is decided at
//! construction and never changes; refreshes update present children in
//! place and never probe absent ones. The facade owns no process
//! resources; all I/O goes through a [`DeviceIo`].

use liquidbridge_core::{
    duty_from_rpm, DeviceAddress, LiquidbridgeError, Result, StatusRecord,
};

use crate::backend::DeviceIo;

/// Upper bound on fan slots a device can report
pub const MAX_FANS: usize = 20;

const KEY_LIQUID_TEMPERATURE: &str = "Liquid temperature";
const KEY_PUMP_SPEED: &str = "Pump speed";
const KEY_PUMP_DUTY: &str = "Pump duty";

fn fan_speed_key(index: usize) -> String {
    format!("Fan {} speed", index)
}

/// Liquid temperature sensor
#[derive(Debug, Clone)]
pub struct LiquidTemperature {
    id: String,
    name: String,
    value: f64,
}

impl LiquidTemperature {
    fn new(record: &StatusRecord) -> Result<Self> {
        let mut sensor = Self {
            id: format!("{}-liqtmp", record.address.to_lowercase()),
            name: format!("Liquid Temp. - {}", record.description),
            value: 0.0,
        };
        sensor.refresh(record)?;
        Ok(sensor)
    }

    fn refresh(&mut self, record: &StatusRecord) -> Result<()> {
        self.value = record.value(KEY_LIQUID_TEMPERATURE)?;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Degrees Celsius
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Pump rotational speed sensor
#[derive(Debug, Clone)]
pub struct PumpSpeed {
    id: String,
    name: String,
    value: f64,
}

impl PumpSpeed {
    fn new(record: &StatusRecord) -> Result<Self> {
        let mut sensor = Self {
            id: format!("{}-pumprpm", record.address.to_lowercase()),
            name: format!("Pump - {}", record.description),
            value: 0.0,
        };
        sensor.refresh(record)?;
        Ok(sensor)
    }

    fn refresh(&mut self, record: &StatusRecord) -> Result<()> {
        self.value = record.value(KEY_PUMP_SPEED)?;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// RPM
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Pump duty control; its value is reported directly by the tool
#[derive(Debug, Clone)]
pub struct PumpDuty {
    address: DeviceAddress,
    id: String,
    name: String,
    value: f64,
}

impl PumpDuty {
    fn new(address: &DeviceAddress, record: &StatusRecord) -> Result<Self> {
        let mut control = Self {
            address: address.clone(),
            id: format!("{}-pumpduty", record.address.to_lowercase()),
            name: format!("Pump Control - {}", record.description),
            value: 0.0,
        };
        control.refresh(record)?;
        Ok(control)
    }

    fn refresh(&mut self, record: &StatusRecord) -> Result<()> {
        self.value = record.value(KEY_PUMP_DUTY)?;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Percent, as last refreshed from the device
    pub fn value(&self) -> f64 {
        self.value
    }

    /// Set the pump duty, skipping the command entirely when the target
    /// equals the last refreshed value (avoids redundant hardware writes).
    pub fn set(&self, io: &dyn DeviceIo, percent: u8) -> Result<()> {
        if f64::from(percent) == self.value {
            return Ok(());
        }
        io.set_pump(&self.address, percent)
    }

    pub fn reset(&self, io: &dyn DeviceIo) -> Result<()> {
        self.set(io, 100)
    }
}

/// Fan rotational speed sensor for one slot
#[derive(Debug, Clone)]
pub struct FanSpeed {
    index: usize,
    id: String,
    name: String,
    value: f64,
}

impl FanSpeed {
    fn new(index: usize, record: &StatusRecord) -> Result<Self> {
        let mut sensor = Self {
            index,
            id: format!("{}-fan{}rpm", record.address, index),
            name: format!("Fan {} - {}", index, record.description),
            value: 0.0,
        };
        sensor.refresh(record)?;
        Ok(sensor)
    }

    fn refresh(&mut self, record: &StatusRecord) -> Result<()> {
        self.value = record.value(&fan_speed_key(self.index))?;
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// RPM
    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Fan duty control for one slot.
///
/// The tool never reports fan duty, so the refreshed value is an
/// estimate from the observed RPM via the calibration table. Writes go
/// straight to the raw speed-percent command, no calibration involved.
#[derive(Debug, Clone)]
pub struct FanDuty {
    index: usize,
    address: DeviceAddress,
    id: String,
    name: String,
    value: u8,
}

impl FanDuty {
    fn new(index: usize, address: &DeviceAddress, record: &StatusRecord) -> Result<Self> {
        let mut control = Self {
            index,
            address: address.clone(),
            id: format!("{}-fan{}ctrl", record.address, index),
            name: format!("Fan {} Control - {}", index, record.description),
            value: 0,
        };
        control.refresh(record)?;
        Ok(control)
    }

    fn refresh(&mut self, record: &StatusRecord) -> Result<()> {
        let rpm = record.value(&fan_speed_key(self.index))?;
        self.value = duty_from_rpm(rpm);
        Ok(())
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Estimated percent, from the last refreshed RPM
    pub fn value(&self) -> u8 {
        self.value
    }

    /// Set the fan duty via the one-shot fallback; always issued, the
    /// cached value is only an estimate and never trusted for
    /// short-circuiting.
    pub fn set(&self, io: &dyn DeviceIo, percent: u8) -> Result<()> {
        io.set_fan(&self.address, self.index, percent)
    }

    pub fn reset(&self, io: &dyn DeviceIo) -> Result<()> {
        self.set(io, 50)
    }
}

/// One fan slot's paired speed sensor and duty control
#[derive(Debug, Clone)]
pub struct FanSlot {
    pub speed: FanSpeed,
    pub duty: FanDuty,
}

/// Facade over one physical device
pub struct Device {
    address: DeviceAddress,
    description: String,
    liquid_temperature: Option<LiquidTemperature>,
    pump_speed: Option<PumpSpeed>,
    pump_duty: Option<PumpDuty>,
    fans: [Option<FanSlot>; MAX_FANS],
}

impl Device {
    /// Build the facade from a device's first status record.
    ///
    /// Presence of every child entity is decided here, once, and stays
    /// fixed for the facade's lifetime.
    pub fn from_record(record: &StatusRecord) -> Result<Self> {
        let address = DeviceAddress::parse(&record.address)?;

        let liquid_temperature = record
            .has_value(KEY_LIQUID_TEMPERATURE)
            .then(|| LiquidTemperature::new(record))
            .transpose()?;
        let pump_speed = record
            .has_value(KEY_PUMP_SPEED)
            .then(|| PumpSpeed::new(record))
            .transpose()?;
        let pump_duty = record
            .has_value(KEY_PUMP_DUTY)
            .then(|| PumpDuty::new(&address, record))
            .transpose()?;

        let mut fans: [Option<FanSlot>; MAX_FANS] = std::array::from_fn(|_| None);
        for (slot, fan) in fans.iter_mut().enumerate() {
            let index = slot + 1;
            if record.has_value(&fan_speed_key(index)) {
                *fan = Some(FanSlot {
                    speed: FanSpeed::new(index, record)?,
                    duty: FanDuty::new(index, &address, record)?,
                });
            }
        }

        Ok(Self {
            address,
            description: record.description.clone(),
            liquid_temperature,
            pump_speed,
            pump_duty,
            fans,
        })
    }

    pub fn address(&self) -> &DeviceAddress {
        &self.address
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn liquid_temperature(&self) -> Option<&LiquidTemperature> {
        self.liquid_temperature.as_ref()
    }

    pub fn pump_speed(&self) -> Option<&PumpSpeed> {
        self.pump_speed.as_ref()
    }

    pub fn pump_duty(&self) -> Option<&PumpDuty> {
        self.pump_duty.as_ref()
    }

    /// Fan slot by 1-based index, if the device reported it at
    /// construction time
    pub fn fan(&self, index: usize) -> Option<&FanSlot> {
        if index == 0 || index > MAX_FANS {
            return None;
        }
        self.fans[index - 1].as_ref()
    }

    /// 1-based indices of present fan slots
    pub fn fan_indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.fans
            .iter()
            .enumerate()
            .filter_map(|(slot, fan)| fan.as_ref().map(|_| slot + 1))
    }

    /// Poll the device through its interactive session and update every
    /// present child in place
    pub fn refresh(&mut self, io: &dyn DeviceIo) -> Result<()> {
        let records = io.read_status(&self.address)?;
        let record = records
            .into_iter()
            .next()
            .ok_or_else(|| LiquidbridgeError::DeviceNotFound(self.address.to_string()))?;
        self.update_from(&record)
    }

    /// Update present children from an already-decoded record; absent
    /// children are never probed.
    pub fn update_from(&mut self, record: &StatusRecord) -> Result<()> {
        if let Some(sensor) = self.liquid_temperature.as_mut() {
            sensor.refresh(record)?;
        }
        if let Some(sensor) = self.pump_speed.as_mut() {
            sensor.refresh(record)?;
        }
        if let Some(control) = self.pump_duty.as_mut() {
            control.refresh(record)?;
        }
        for fan in self.fans.iter_mut().flatten() {
            fan.speed.refresh(record)?;
            fan.duty.refresh(record)?;
        }
        Ok(())
    }

    /// Set the primary pump duty; errors if the device has no pump duty
    /// control
    pub fn set_pump_duty(&self, io: &dyn DeviceIo, percent: u8) -> Result<()> {
        self.pump_duty
            .as_ref()
            .ok_or_else(|| {
                LiquidbridgeError::ReadingContract {
                    key: KEY_PUMP_DUTY.to_string(),
                    matches: 0,
                }
            })?
            .set(io, percent)
    }

    /// Set one fan slot's duty; errors if the slot is absent
    pub fn set_fan_duty(&self, io: &dyn DeviceIo, index: usize, percent: u8) -> Result<()> {
        self.fan(index)
            .ok_or_else(|| {
                LiquidbridgeError::ReadingContract {
                    key: fan_speed_key(index),
                    matches: 0,
                }
            })?
            .duty
            .set(io, percent)
    }

    /// One-line human-readable summary of the present children
    pub fn device_info(&self) -> String {
        let mut info = format!("Device @ {}", self.address);
        if let Some(sensor) = &self.liquid_temperature {
            info.push_str(&format!(", Liquid @ {}", sensor.value()));
        }
        if let Some(sensor) = &self.pump_speed {
            info.push_str(&format!(", Pump @ {}", sensor.value()));
        }
        if let Some(control) = &self.pump_duty {
            info.push_str(&format!("({})", control.value()));
        }
        for (slot, fan) in self.fans.iter().enumerate() {
            if let Some(fan) = fan {
                info.push_str(&format!(
                    ", Fan{} @ {} ({})",
                    slot + 1,
                    fan.speed.value(),
                    fan.duty.value()
                ));
            }
        }
        info
    }
}
