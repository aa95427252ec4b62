//! Target temperature clamping for dual-setpoint zones.
//!
//! A request may move the heat setpoint, the cool setpoint, or both. The
//! result keeps both inside the thermostat's limits and at least a deadband
//! apart, moving the side the user did not touch rather than the one they did.

/// What the user asked for. `set_temperature` is passed through untouched;
/// single-setpoint modes resolve it further down.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SetpointRequest {
    pub heat: Option<f64>,
    pub cool: Option<f64>,
    pub set_temperature: Option<f64>,
}

/// The zone's current setpoints and the thermostat's constraints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetpointBounds {
    pub current_heat: f64,
    pub current_cool: f64,
    pub deadband: f64,
    pub min: f64,
    pub max: f64,
}

/// Apply the four clamp steps in order:
///
/// 1. a requested heat setpoint leaves room for the deadband under `max`;
/// 2. a requested cool setpoint leaves room for it over `min`;
/// 3. a changed heat setpoint pushes cool up to keep the deadband;
/// 4. a changed cool setpoint pushes heat down, overriding step 3.
///
/// An absent side is compared through its current value. Step 3 may fill in
/// the cool side; step 4 then sees that value as the requested cool.
pub fn clamp_setpoints(request: SetpointRequest, bounds: &SetpointBounds) -> SetpointRequest {
    let SetpointBounds {
        current_heat,
        current_cool,
        deadband,
        min,
        max,
    } = *bounds;
    let mut heat = request.heat;
    let mut cool = request.cool;

    if let Some(h) = heat
        && h + deadband > max
    {
        heat = Some(max - deadband);
    }
    if let Some(c) = cool
        && c - deadband < min
    {
        cool = Some(min + deadband);
    }

    if let Some(h) = heat
        && h != current_heat
        && cool.unwrap_or(current_cool) - h < deadband
    {
        cool = Some(h + deadband);
    }
    if let Some(c) = cool
        && c != current_cool
        && c - heat.unwrap_or(current_heat) < deadband
    {
        heat = Some(c - deadband);
    }

    SetpointRequest {
        heat,
        cool,
        set_temperature: request.set_temperature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn bounds(current_heat: f64, current_cool: f64) -> SetpointBounds {
        SetpointBounds {
            current_heat,
            current_cool,
            deadband: 3.0,
            min: 55.0,
            max: 99.0,
        }
    }

    #[test]
    fn raising_heat_pushes_cool() {
        let out = clamp_setpoints(
            SetpointRequest {
                heat: Some(70.0),
                ..Default::default()
            },
            &bounds(63.0, 71.0),
        );
        assert_eq!(out.heat, Some(70.0));
        assert_eq!(out.cool, Some(73.0));
    }

    #[test]
    fn lowering_cool_pushes_heat_down() {
        let out = clamp_setpoints(
            SetpointRequest {
                heat: Some(63.0),
                cool: Some(58.0),
                set_temperature: None,
            },
            &bounds(63.0, 71.0),
        );
        assert_eq!(out.heat, Some(55.0));
        assert_eq!(out.cool, Some(58.0));
    }

    #[test]
    fn heat_near_max_is_clamped() {
        let out = clamp_setpoints(
            SetpointRequest {
                heat: Some(98.0),
                cool: Some(99.0),
                set_temperature: None,
            },
            &bounds(63.0, 71.0),
        );
        assert_eq!(out.heat, Some(96.0));
        assert_eq!(out.cool, Some(99.0));
    }

    #[test]
    fn cool_near_min_is_clamped() {
        let out = clamp_setpoints(
            SetpointRequest {
                cool: Some(56.0),
                ..Default::default()
            },
            &bounds(63.0, 71.0),
        );
        assert_eq!(out.cool, Some(58.0));
        assert_eq!(out.heat, Some(55.0));
    }

    #[test]
    fn changed_heat_moves_a_requested_cool() {
        let out = clamp_setpoints(
            SetpointRequest {
                heat: Some(70.0),
                cool: Some(70.0),
                set_temperature: None,
            },
            &bounds(63.0, 75.0),
        );
        assert_eq!(out.cool, Some(73.0));
        assert_eq!(out.heat, Some(70.0));
    }

    #[test]
    fn set_temperature_passes_through() {
        let out = clamp_setpoints(
            SetpointRequest {
                set_temperature: Some(72.0),
                ..Default::default()
            },
            &bounds(63.0, 71.0),
        );
        assert_eq!(out, SetpointRequest {
            set_temperature: Some(72.0),
            ..Default::default()
        });
    }

    fn scenario() -> impl Strategy<Value = (SetpointBounds, f64, f64)> {
        (40i32..60, 1i32..6, 10i32..50)
            .prop_flat_map(|(min, deadband, span)| {
                let max = min + deadband * 2 + span;
                (
                    Just((min, max, deadband)),
                    min..=max - deadband,
                    min..=max,
                    min..=max,
                )
            })
            .prop_flat_map(|((min, max, deadband), cur_heat, new_heat, new_cool)| {
                (
                    Just((min, max, deadband, cur_heat, new_heat, new_cool)),
                    cur_heat + deadband..=max,
                )
            })
            .prop_map(|((min, max, deadband, cur_heat, new_heat, new_cool), cur_cool)| {
                (
                    SetpointBounds {
                        current_heat: cur_heat as f64,
                        current_cool: cur_cool as f64,
                        deadband: deadband as f64,
                        min: min as f64,
                        max: max as f64,
                    },
                    new_heat as f64,
                    new_cool as f64,
                )
            })
    }

    proptest! {
        #[test]
        fn result_respects_deadband_and_limits((b, new_heat, new_cool) in scenario()) {
            let out = clamp_setpoints(
                SetpointRequest { heat: Some(new_heat), cool: Some(new_cool), set_temperature: None },
                &b,
            );
            let heat = out.heat.unwrap();
            let cool = out.cool.unwrap();
            prop_assert!(heat + b.deadband <= cool, "heat {heat} cool {cool}");
            prop_assert!(heat >= b.min && cool <= b.max, "heat {heat} cool {cool}");
        }

        #[test]
        fn clamping_is_idempotent((b, new_heat, new_cool) in scenario()) {
            let once = clamp_setpoints(
                SetpointRequest { heat: Some(new_heat), cool: Some(new_cool), set_temperature: None },
                &b,
            );
            let twice = clamp_setpoints(once, &b);
            prop_assert_eq!(once, twice);
        }

        #[test]
        fn heat_only_requests_keep_the_band((b, new_heat, _) in scenario()) {
            let out = clamp_setpoints(
                SetpointRequest { heat: Some(new_heat), ..Default::default() },
                &b,
            );
            let heat = out.heat.unwrap();
            let cool = out.cool.unwrap_or(b.current_cool);
            prop_assert!(heat + b.deadband <= cool);
            prop_assert!(cool <= b.max);
        }
    }
}
