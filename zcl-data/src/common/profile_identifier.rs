//! Common profile identifiers

extended_enum!(
    /// Profile identifiers
    ProfileIdentifier, u16,
    /// Device profile
    DeviceProfile => 0x0000,
    /// Home automation profile, also used by Zigbee 3.0 devices
    HomeAutomation => 0x0104,
    /// Smart energy profile
    SmartEnergy => 0x0109,
    /// Green power profile
    GreenPower => 0xa1e0,
    /// Light link profile
    LightLink => 0xc05e,
    /// Wildcard profile
    Wildcard => 0xffff,
);
