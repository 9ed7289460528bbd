use serde::Serialize;

use crate::catalog::SensorKind;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    High,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Warning {
    pub level: Level,
    pub threshold: f64,
    pub message: &'static str,
}

type Limit = Option<(f64, &'static str)>;

// (too low, too high); values strictly beyond a limit warn.
fn limits(kind: SensorKind) -> (Limit, Limit) {
    match kind {
        SensorKind::Temperature => (
            Some((18.0, "It's too cold to concentrate. Consider turning up the heat.")),
            Some((26.0, "It's too hot to concentrate. Consider opening a window.")),
        ),
        SensorKind::Humidity => (
            Some((30.0, "The air is too dry. Consider increasing ventilation or opening a window.")),
            Some((60.0, "The air is too humid. Consider opening a window.")),
        ),
        SensorKind::Co2 => (None, Some((1000.0, "CO2 levels are high. Open a window for fresh air."))),
        SensorKind::Iaq => (
            None,
            Some((100.0, "Indoor Air Quality is poor. Consider increasing ventilation or opening a window.")),
        ),
        SensorKind::UvIndex => (
            None,
            Some((6.0, "UV Index is high. Consider closing the blinds or staying out of direct sunlight.")),
        ),
        SensorKind::NoiseLevel => (
            None,
            Some((80.0, "Noise levels are high. Consider reducing the noise or moving to a quieter space.")),
        ),
        SensorKind::Pressure => (
            Some((980.0, "Atmospheric pressure is low. It might feel stuffy. Consider opening a window.")),
            Some((1030.0, "Atmospheric pressure is high. Consider opening a window to ventilate the room.")),
        ),
        SensorKind::Light => (
            Some((50.0, "Light levels are too low. Consider turning on more lights.")),
            Some((1000.0, "Light levels are too bright. Consider adjusting the lighting.")),
        ),
        SensorKind::GasResistance => (
            None,
            Some((1000.0, "Gas resistance is high. Open a window or ventilate the room.")),
        ),
    }
}

fn judge(value: f64, (low, high): (Limit, Limit)) -> Option<Warning> {
    if let Some((threshold, message)) = low {
        if value < threshold {
            return Some(Warning { level: Level::Low, threshold, message });
        }
    }
    if let Some((threshold, message)) = high {
        if value > threshold {
            return Some(Warning { level: Level::High, threshold, message });
        }
    }
    None
}

pub fn check(kind: SensorKind, value: f64) -> Option<Warning> {
    judge(value, limits(kind))
}

pub fn check_occupancy(people: u32) -> Option<Warning> {
    judge(
        f64::from(people),
        (None, Some((10.0, "Too many people in the room. Consider moving to a less crowded room."))),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comfortable_values_do_not_warn() {
        assert_eq!(check(SensorKind::Temperature, 21.0), None);
        assert_eq!(check(SensorKind::Temperature, 26.0), None);
        assert_eq!(check(SensorKind::Co2, 1000.0), None);
        assert_eq!(check(SensorKind::UvIndex, 0.0), None);
    }

    #[test]
    fn values_beyond_limits_warn() {
        let cold = check(SensorKind::Temperature, 17.5).unwrap();
        assert_eq!(cold.level, Level::Low);
        assert_eq!(cold.threshold, 18.0);

        let stuffy = check(SensorKind::Co2, 1400.0).unwrap();
        assert_eq!(stuffy.level, Level::High);
        assert!(stuffy.message.contains("CO2"));
    }

    #[test]
    fn one_sided_limits_ignore_the_other_side() {
        assert_eq!(check(SensorKind::Co2, 0.0), None);
        assert_eq!(check(SensorKind::GasResistance, -1.0), None);
    }

    #[test]
    fn crowded_rooms_warn() {
        assert_eq!(check_occupancy(10), None);
        assert_eq!(check_occupancy(11).unwrap().level, Level::High);
    }
}
