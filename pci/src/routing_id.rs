use derive_more::Display;

/// Географические координаты PCI--устройства.
///
/// Посредник не проверяет, что номер устройства и номер функции лежат
/// в допустимых для шины PCI пределах
/// [`RoutingId::MAX_DEVICE_COUNT`] и [`RoutingId::MAX_FUNCTION_COUNT`] ---
/// по каналу они передаются полными байтами,
/// а аппаратура сама игнорирует лишние биты.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("{:02x}:{:02x}.{:01x}", bus, device, function)]
pub struct RoutingId {
    /// Номер шины.
    bus: u8,

    /// Номер устройства на шине.
    device: u8,

    /// Номер функции в устройстве.
    function: u8,
}

impl RoutingId {
    /// Создаёт географические координаты PCI--устройства.
    pub const fn new(
        bus: u8,
        device: u8,
        function: u8,
    ) -> Self {
        Self {
            bus,
            device,
            function,
        }
    }

    /// Возвращает номер шины.
    pub fn bus(&self) -> u8 {
        self.bus
    }

    /// Возвращает номер устройства на шине.
    pub fn device(&self) -> u8 {
        self.device
    }

    /// Возвращает номер функции в устройстве.
    pub fn function(&self) -> u8 {
        self.function
    }

    /// Максимальное количество устройств на одной шине.
    pub const MAX_DEVICE_COUNT: u8 = 1 << 5;

    /// Максимальное количество функций в одном устройстве.
    pub const MAX_FUNCTION_COUNT: u8 = 1 << 3;
}
