//! The multisensor deployment: which device sits in which room, and which
//! measurements every device reports.

use serde::Serialize;

use crate::reading::SensorId;

pub const ENTITY_PREFIX: &str = "sensor.multisensor_";

const CEILING_HEIGHT_M: f64 = 3.2;

#[derive(Clone, Copy, Debug, Serialize)]
pub struct Room {
    pub device: &'static str,
    pub name: &'static str,
    /// Floor area; zero where the space is not closed off.
    pub area_m2: f64,
}

impl Room {
    pub fn volume_m3(&self) -> f64 {
        self.area_m2 * CEILING_HEIGHT_M
    }
}

const fn room(device: &'static str, name: &'static str, area_m2: f64) -> Room {
    Room { device, name, area_m2 }
}

pub const ROOMS: &[Room] = &[
    room("multisensor_115", "Conference-Space", 21.06),
    room("multisensor_108", "zwischen Conference-Space und Robot-Space", 14.04),
    room("multisensor_107", "Robot-Space", 30.03),
    room("multisensor_114", "Empfang", 31.27),
    room("multisensor_110", "zwischen Empfang und Focus-Space", 13.26),
    room("multisensor_109", "Focus-Space", 50.7),
    room("multisensor_104", "Experience-Hub", 88.27),
    room("multisensor_106", "Design-Thinking-Space", 43.86),
    room("multisensor_111", "Co-Working-Space (Left in Picture)", 48.0),
    room("multisensor_103", "Co-Working-Space (Right in Picture)", 46.35),
    room("multisensor_113", "Social Lounge", 34.74),
    room("multisensor_112", "Hallway", 0.0),
    room("multisensor_105", "3D Printing-Space", 0.0),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum SensorKind {
    Humidity,
    Temperature,
    Co2,
    Iaq,
    UvIndex,
    NoiseLevel,
    Pressure,
    Light,
    GasResistance,
}

impl SensorKind {
    pub const ALL: [SensorKind; 9] = [
        SensorKind::Humidity,
        SensorKind::Temperature,
        SensorKind::Co2,
        SensorKind::Iaq,
        SensorKind::UvIndex,
        SensorKind::NoiseLevel,
        SensorKind::Pressure,
        SensorKind::Light,
        SensorKind::GasResistance,
    ];

    pub fn title(self) -> &'static str {
        match self {
            SensorKind::Humidity => "Humidity",
            SensorKind::Temperature => "Temperature",
            SensorKind::Co2 => "CO2",
            SensorKind::Iaq => "IAQ",
            SensorKind::UvIndex => "UV Index",
            SensorKind::NoiseLevel => "Microphone Noise Level",
            SensorKind::Pressure => "Pressure",
            SensorKind::Light => "Light",
            SensorKind::GasResistance => "Gas Resistance",
        }
    }

    /// Entity id suffix after the device name.
    pub fn suffix(self) -> &'static str {
        match self {
            SensorKind::Humidity => "_bme680_humidity",
            SensorKind::Temperature => "_bme680_temperature",
            SensorKind::Co2 => "_scd30_co2",
            SensorKind::Iaq => "_bme680_iaq",
            SensorKind::UvIndex => "_ltr390_uv_index",
            SensorKind::NoiseLevel => "_microphone_noise_level",
            SensorKind::Pressure => "_bme680_pressure",
            SensorKind::Light => "_ltr390_light",
            SensorKind::GasResistance => "_bme680_gas_resistance",
        }
    }

    /// Unit of measurement, which is also the store's measurement name.
    pub fn unit(self) -> &'static str {
        match self {
            SensorKind::Humidity => "%",
            SensorKind::Temperature => "°C",
            SensorKind::Co2 => "ppm",
            SensorKind::Iaq => "IAQ",
            SensorKind::UvIndex => "UVI",
            SensorKind::NoiseLevel => "Volume",
            SensorKind::Pressure => "hPa",
            SensorKind::Light => "lx",
            SensorKind::GasResistance => "Ω",
        }
    }

    /// Value considered comfortable; used to judge whether a change is good.
    pub fn ideal(self) -> f64 {
        match self {
            SensorKind::Humidity => 45.0,
            SensorKind::Temperature => 21.0,
            SensorKind::Co2 => 400.0,
            SensorKind::Iaq => 50.0,
            SensorKind::UvIndex => 0.0,
            SensorKind::NoiseLevel => 40.0,
            SensorKind::Pressure => 1013.0,
            SensorKind::Light => 400.0,
            SensorKind::GasResistance => 200.0,
        }
    }

    pub fn from_entity_id(id: &SensorId) -> Option<(&'static Room, SensorKind)> {
        let rest = id.as_str().strip_prefix("sensor.")?;
        ROOMS.iter().find_map(|room| {
            let suffix = rest.strip_prefix(room.device)?;
            SensorKind::ALL.into_iter().find(|k| k.suffix() == suffix).map(|k| (room, k))
        })
    }
}

pub fn entity_id(room: &Room, kind: SensorKind) -> SensorId {
    SensorId::new(format!("sensor.{device}{suffix}", device = room.device, suffix = kind.suffix()))
}

#[derive(Serialize)]
pub struct CatalogEntry {
    pub device: &'static str,
    pub room: &'static str,
    pub volume_m3: f64,
    pub sensors: Vec<CatalogSensor>,
}

#[derive(Serialize)]
pub struct CatalogSensor {
    pub kind: SensorKind,
    pub title: &'static str,
    pub unit: &'static str,
    pub entity_id: SensorId,
}

pub fn listing() -> Vec<CatalogEntry> {
    ROOMS
        .iter()
        .map(|room| CatalogEntry {
            device: room.device,
            room: room.name,
            volume_m3: room.volume_m3(),
            sensors: SensorKind::ALL
                .into_iter()
                .map(|kind| CatalogSensor {
                    kind,
                    title: kind.title(),
                    unit: kind.unit(),
                    entity_id: entity_id(room, kind),
                })
                .collect(),
        })
        .collect()
}
