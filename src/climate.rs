use std::sync::Arc;

use serde_json::{Map, Value, json};
use tracing::info;

use crate::clamp::{SetpointBounds, SetpointRequest, clamp_setpoints};
use crate::coordinator::Coordinator;
use crate::entity::*;
use crate::types::*;
use crate::zone::Zone;
use crate::{Error, Result};

/// Arguments of a set-temperature command. `temperature` is the single
/// target used outside heat/cool mode.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SetTemperature {
    pub target_temp_low: Option<f64>,
    pub target_temp_high: Option<f64>,
    pub temperature: Option<f64>,
}

/// One zone as a climate entity.
#[derive(Debug)]
pub struct ZoneClimate {
    link: CoordinatorLink,
    entity_id: String,
    thermostat_id: u64,
    zone_id: u64,
}

impl ZoneClimate {
    pub fn new(coordinator: Arc<Coordinator>, entity_id: String, thermostat_id: u64, zone_id: u64) -> Self {
        Self {
            link: CoordinatorLink::new(coordinator),
            entity_id,
            thermostat_id,
            zone_id,
        }
    }

    pub fn link(&self) -> &CoordinatorLink {
        &self.link
    }

    pub fn thermostat_id(&self) -> u64 {
        self.thermostat_id
    }

    pub fn zone_id(&self) -> u64 {
        self.zone_id
    }

    fn coordinator(&self) -> &Coordinator {
        self.link.coordinator()
    }

    fn read<T>(&self, f: impl FnOnce(&Zone<'_>) -> Result<T>) -> Result<T> {
        let house = self.coordinator().snapshot()?;
        let zone = house.zone(self.thermostat_id, self.zone_id)?;
        f(&zone)
    }

    pub fn supported_features(&self) -> Result<u32> {
        self.read(|zone| {
            let t = zone.thermostat();
            let mut supported = SUPPORT_TARGET_TEMPERATURE | SUPPORT_FAN_MODE | SUPPORT_PRESET_MODE;
            if t.has_relative_humidity() {
                supported |= SUPPORT_TARGET_HUMIDITY;
            }
            if t.has_emergency_heat() {
                supported |= SUPPORT_AUX_HEAT;
            }
            Ok(supported)
        })
    }

    pub fn temperature_unit(&self) -> Result<TemperatureUnit> {
        self.read(|zone| zone.thermostat().unit())
    }

    pub fn current_temperature(&self) -> Result<f64> {
        self.read(|zone| zone.temperature())
    }

    pub fn target_temperature(&self) -> Result<f64> {
        self.read(|zone| match zone.current_mode()? {
            OperationMode::Cool => zone.cooling_setpoint(),
            _ => zone.heating_setpoint(),
        })
    }

    pub fn target_temperature_low(&self) -> Result<f64> {
        self.read(|zone| zone.heating_setpoint())
    }

    pub fn target_temperature_high(&self) -> Result<f64> {
        self.read(|zone| zone.cooling_setpoint())
    }

    pub fn min_temp(&self) -> Result<f64> {
        self.read(|zone| Ok(zone.thermostat().setpoint_limits()?.0))
    }

    pub fn max_temp(&self) -> Result<f64> {
        self.read(|zone| Ok(zone.thermostat().setpoint_limits()?.1))
    }

    pub fn hvac_mode(&self) -> Result<HvacMode> {
        self.read(|zone| Ok(HvacMode::from_vendor(zone.requested_mode()?, zone.is_in_permanent_hold()?)))
    }

    pub fn hvac_modes(&self) -> &'static [HvacMode] {
        &HvacMode::ALL
    }

    pub fn hvac_action(&self) -> Result<HvacAction> {
        self.read(|zone| {
            if zone.requested_mode()? == OperationMode::Off {
                return Ok(HvacAction::Off);
            }
            if !zone.is_calling() {
                return Ok(HvacAction::Idle);
            }
            Ok(match zone.thermostat().system_status()? {
                SYSTEM_STATUS_COOL => HvacAction::Cooling,
                SYSTEM_STATUS_HEAT => HvacAction::Heating,
                _ => HvacAction::Idle,
            })
        })
    }

    pub fn fan_mode(&self) -> Result<FanMode> {
        self.read(|zone| zone.thermostat().fan_mode())
    }

    pub fn fan_modes(&self) -> &'static [FanMode] {
        &FanMode::ALL
    }

    pub fn is_fan_on(&self) -> Result<bool> {
        self.read(|zone| zone.thermostat().is_blower_active())
    }

    pub fn preset_mode(&self) -> Result<String> {
        self.read(|zone| zone.preset().map(str::to_string))
    }

    pub fn preset_modes(&self) -> Result<Vec<String>> {
        self.read(|zone| Ok(zone.presets()?.into_iter().map(str::to_string).collect()))
    }

    /// Indoor humidity in percent, `None` without a humidity sensor.
    pub fn current_humidity(&self) -> Result<Option<f64>> {
        self.read(|zone| {
            let t = zone.thermostat();
            if !t.has_relative_humidity() {
                return Ok(None);
            }
            Ok(Some(round1(t.relative_humidity()? * 100.0)))
        })
    }

    pub fn supports_humidify(&self) -> Result<bool> {
        self.read(|zone| Ok(zone.thermostat().has_humidify_support()))
    }

    /// `None` when the thermostat has no emergency heat.
    pub fn is_aux_heat(&self) -> Result<Option<bool>> {
        self.read(|zone| {
            let t = zone.thermostat();
            if !t.has_emergency_heat() {
                return Ok(None);
            }
            t.is_emergency_heat_active().map(Some)
        })
    }

    // Commands. Each one writes, then asks the coordinator for fresh data.

    async fn refresh(&self) {
        self.coordinator().request_refresh().await;
    }

    pub async fn set_temperature(&self, args: SetTemperature) -> Result<()> {
        let house = self.coordinator().snapshot()?;
        let zone = house.zone(self.thermostat_id, self.zone_id)?;
        // Clamp on the unit grid so rounding in the zone write is a no-op.
        let unit = zone.thermostat().unit()?;
        let (min, max) = zone.thermostat().setpoint_limits()?;
        let bounds = SetpointBounds {
            current_heat: zone.heating_setpoint()?,
            current_cool: zone.cooling_setpoint()?,
            deadband: zone.thermostat().deadband()?,
            min,
            max,
        };
        let request = clamp_setpoints(
            SetpointRequest {
                heat: args.target_temp_low.map(|t| unit.round(t)),
                cool: args.target_temp_high.map(|t| unit.round(t)),
                set_temperature: args.temperature,
            },
            &bounds,
        );
        zone.set_heat_cool_temp(
            self.coordinator().api(),
            request.heat,
            request.cool,
            request.set_temperature,
        )
        .await?;
        self.refresh().await;
        Ok(())
    }

    pub async fn set_fan_mode(&self, fan_mode: &str) -> Result<()> {
        let mode = FanMode::from_nexia_str(fan_mode)
            .ok_or_else(|| Error::InvalidValue(format!("fan mode {fan_mode:?}")))?;
        let house = self.coordinator().snapshot()?;
        let thermostat = house.thermostat(self.thermostat_id)?;
        thermostat.set_fan_mode(self.coordinator().api(), mode).await?;
        self.refresh().await;
        Ok(())
    }

    /// `none` returns the zone to its schedule; anything else is a preset.
    pub async fn set_hold_mode(&self, hold_mode: &str) -> Result<()> {
        let house = self.coordinator().snapshot()?;
        let zone = house.zone(self.thermostat_id, self.zone_id)?;
        if hold_mode.eq_ignore_ascii_case(PRESET_NONE) {
            zone.call_return_to_schedule(self.coordinator().api()).await?;
        } else {
            zone.set_preset(self.coordinator().api(), hold_mode).await?;
        }
        self.refresh().await;
        Ok(())
    }

    pub async fn set_preset_mode(&self, preset: &str) -> Result<()> {
        let house = self.coordinator().snapshot()?;
        let zone = house.zone(self.thermostat_id, self.zone_id)?;
        zone.set_preset(self.coordinator().api(), preset).await?;
        self.refresh().await;
        Ok(())
    }

    /// Target humidity in percent, applied as the dehumidify setpoint.
    pub async fn set_humidity(&self, humidity: f64) -> Result<()> {
        let house = self.coordinator().snapshot()?;
        let thermostat = house.thermostat(self.thermostat_id)?;
        thermostat
            .set_dehumidify_setpoint(self.coordinator().api(), humidity / 100.0)
            .await?;
        self.refresh().await;
        Ok(())
    }

    pub async fn set_humidify_setpoint(&self, humidity: f64) -> Result<()> {
        let house = self.coordinator().snapshot()?;
        let thermostat = house.thermostat(self.thermostat_id)?;
        thermostat
            .set_humidify_setpoint(self.coordinator().api(), humidity / 100.0)
            .await?;
        self.refresh().await;
        Ok(())
    }

    pub async fn set_aircleaner_mode(&self, mode: &str) -> Result<()> {
        let house = self.coordinator().snapshot()?;
        let thermostat = house.thermostat(self.thermostat_id)?;
        thermostat.set_air_cleaner(self.coordinator().api(), mode).await?;
        self.refresh().await;
        Ok(())
    }

    async fn set_aux_heat(&self, on: bool) -> Result<()> {
        let house = self.coordinator().snapshot()?;
        let thermostat = house.thermostat(self.thermostat_id)?;
        thermostat.set_emergency_heat(self.coordinator().api(), on).await?;
        self.refresh().await;
        Ok(())
    }

    pub async fn turn_aux_heat_on(&self) -> Result<()> {
        self.set_aux_heat(true).await
    }

    pub async fn turn_aux_heat_off(&self) -> Result<()> {
        self.set_aux_heat(false).await
    }

    pub async fn turn_on(&self) -> Result<()> {
        self.set_hvac_mode(HvacMode::Auto.as_str()).await
    }

    pub async fn turn_off(&self) -> Result<()> {
        self.set_hvac_mode(HvacMode::Off.as_str()).await
    }

    pub async fn set_swing_mode(&self, _swing_mode: &str) -> Result<()> {
        Err(Error::UnsupportedOperation("set_swing_mode"))
    }

    /// `auto` follows the schedule in AUTO. Every other mode, `heat_cool`
    /// included, holds permanently first. The mode is validated before any
    /// write is sent.
    pub async fn set_hvac_mode(&self, hvac_mode: &str) -> Result<()> {
        let requested = hvac_mode.to_ascii_lowercase();
        let mode = match HvacMode::from_host_str(&requested) {
            Some(mode) => mode,
            None => {
                return Err(Error::UnsupportedMode {
                    mode: hvac_mode.to_ascii_uppercase(),
                    supported: OperationMode::supported(),
                });
            }
        };

        let house = self.coordinator().snapshot()?;
        let zone = house.zone(self.thermostat_id, self.zone_id)?;
        let api = self.coordinator().api();
        info!(zone = self.zone_id, mode = mode.as_str(), "setting hvac mode");
        if mode == HvacMode::Auto {
            zone.call_return_to_schedule(api).await?;
        } else {
            zone.call_permanent_hold(api).await?;
        }
        zone.set_mode(api, mode.to_vendor()).await?;
        self.refresh().await;
        Ok(())
    }
}

impl Entity for ZoneClimate {
    fn entity_id(&self) -> &str {
        &self.entity_id
    }

    fn unique_id(&self) -> String {
        format!("{}_zone", self.zone_id)
    }

    fn name(&self) -> Result<String> {
        self.read(|zone| zone.name().map(str::to_string))
    }

    fn available(&self) -> bool {
        self.link.available()
    }

    fn state(&self) -> Result<Value> {
        Ok(self.hvac_mode()?.as_str().into())
    }

    fn attributes(&self) -> Result<Map<String, Value>> {
        self.read(|zone| {
            let t = zone.thermostat();
            let (min_temp, max_temp) = t.setpoint_limits()?;
            let hvac_mode = HvacMode::from_vendor(zone.requested_mode()?, zone.is_in_permanent_hold()?);

            let mut data = Map::new();
            data.insert(ATTR_ATTRIBUTION.into(), ATTRIBUTION.into());
            data.insert(ATTR_FAN_MODE.into(), t.fan_mode()?.as_nexia_str().into());
            data.insert(ATTR_HVAC_MODE.into(), hvac_mode.as_str().into());
            data.insert(ATTR_TARGET_TEMP_HIGH.into(), zone.cooling_setpoint()?.into());
            data.insert(ATTR_TARGET_TEMP_LOW.into(), zone.heating_setpoint()?.into());
            data.insert(ATTR_TARGET_TEMP_STEP.into(), t.unit()?.target_temp_step().into());
            data.insert(ATTR_MIN_TEMP.into(), min_temp.into());
            data.insert(ATTR_MAX_TEMP.into(), max_temp.into());
            data.insert(
                ATTR_FAN_MODES.into(),
                json!(FanMode::ALL.map(|m| m.as_nexia_str())),
            );
            data.insert(
                ATTR_HVAC_MODES.into(),
                json!(HvacMode::ALL.map(|m| m.as_str())),
            );
            data.insert(ATTR_PRESET_MODE.into(), zone.preset()?.into());
            data.insert(ATTR_HOLD_MODES.into(), json!(zone.presets()?));
            data.insert(ATTR_SETPOINT_STATUS.into(), zone.setpoint_status()?.into());
            data.insert(ATTR_ZONE_STATUS.into(), zone.status()?.into());
            data.insert(ATTR_THERMOSTAT_ID.into(), t.id().into());
            data.insert(ATTR_ZONE_ID.into(), zone.id().into());

            if t.has_emergency_heat() {
                let aux = if t.is_emergency_heat_active()? { "on" } else { "off" };
                data.insert(ATTR_AUX_HEAT.into(), aux.into());
            }

            if t.has_relative_humidity() {
                let (min_humidity, max_humidity) = t.humidity_setpoint_limits();
                data.insert(ATTR_HUMIDIFY_SUPPORTED.into(), t.has_humidify_support().into());
                data.insert(ATTR_DEHUMIDIFY_SUPPORTED.into(), t.has_dehumidify_support().into());
                data.insert(
                    ATTR_CURRENT_HUMIDITY.into(),
                    round1(t.relative_humidity()? * 100.0).into(),
                );
                data.insert(ATTR_MIN_HUMIDITY.into(), round1(min_humidity * 100.0).into());
                data.insert(ATTR_MAX_HUMIDITY.into(), round1(max_humidity * 100.0).into());
                if t.has_dehumidify_support() {
                    let setpoint = round1(t.dehumidify_setpoint()? * 100.0);
                    data.insert(ATTR_DEHUMIDIFY_SETPOINT.into(), setpoint.into());
                    data.insert(ATTR_HUMIDITY.into(), setpoint.into());
                }
                if t.has_humidify_support() {
                    data.insert(
                        ATTR_HUMIDIFY_SETPOINT.into(),
                        round1(t.humidify_setpoint()? * 100.0).into(),
                    );
                }
            }
            Ok(data)
        })
    }

    fn device_info(&self) -> Result<Option<DeviceInfo>> {
        self.read(|zone| {
            let t = zone.thermostat();
            Ok(Some(DeviceInfo {
                identifiers: vec![(DOMAIN.to_string(), zone.id())],
                name: zone.name()?.to_string(),
                model: t.model()?.to_string(),
                sw_version: t.firmware()?.to_string(),
                manufacturer: MANUFACTURER.to_string(),
                via_device: Some((DOMAIN.to_string(), t.id())),
            }))
        })
    }
}
