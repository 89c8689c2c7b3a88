/// Service types the bridge exposes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum ServiceKind {
    AccessoryInformation,
    Lightbulb,
    Switch,
    Outlet,
}

/// Characteristic types the bridge reads or writes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
pub enum CharacteristicKind {
    Name,
    On,
    Brightness,
    ColorTemperature,
    Hue,
    Saturation,
    Manufacturer,
    Model,
    SerialNumber,
}

/// Accessory category, as the numeric value the host protocol uses.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[repr(u8)]
pub enum Category {
    #[default]
    Other = 1,
    Lightbulb = 5,
    Outlet = 7,
    Switch = 8,
    ProgrammableSwitch = 15,
}

impl Category {
    pub fn code(self) -> u8 {
        self as u8
    }
}
