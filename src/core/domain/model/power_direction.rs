/// The direction of a toggle request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PowerDirection {
    On,
    Off,
}

impl PowerDirection {
    /// The state string the management API uses, `ON` or `OFF`.
    pub fn as_state(&self) -> &'static str {
        match self {
            PowerDirection::On => "ON",
            PowerDirection::Off => "OFF",
        }
    }

    /// The command segment of the toggle endpoint.
    pub fn action(&self) -> &'static str {
        match self {
            PowerDirection::On => "TurnON",
            PowerDirection::Off => "TurnOFF",
        }
    }

    /// The state an application must be in for this toggle to apply.
    pub fn source_state(&self) -> &'static str {
        self.opposite().as_state()
    }

    pub fn opposite(&self) -> Self {
        match self {
            PowerDirection::On => PowerDirection::Off,
            PowerDirection::Off => PowerDirection::On,
        }
    }
}

impl std::fmt::Display for PowerDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_state())
    }
}
