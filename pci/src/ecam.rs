use derive_more::Display;

use crate::routing_id::RoutingId;

/// Базовый физический адрес области
/// [Enhanced Configuration Access Mechanism (ECAM)](https://en.wikipedia.org/wiki/PCI_Express#Hardware_protocol_summary),
/// за которой стоят расширенные пространства конфигурации всех функций
/// всех устройств PCI Express платформы.
///
/// Вычисляется один раз при инициализации сессии из значения регистра
/// [`EcamBase::BASE_REGISTER_OFFSET`] корневого устройства `00:00.0`
/// и далее не меняется.
/// Неудача чтения этого регистра --- фатальная ошибка инициализации,
/// а не ошибка отдельного запроса.
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
#[display("{_0:#X}")]
pub struct EcamBase(u64);

impl EcamBase {
    /// Выделяет базовый адрес ECAM из сырого значения `raw` регистра
    /// [`EcamBase::BASE_REGISTER_OFFSET`].
    ///
    /// Младшие биты регистра кодируют флаги управления, а не адрес,
    /// и маской [`EcamBase::ADDRESS_MASK`] сбрасываются в ноль.
    pub fn resolve(raw: u64) -> Self {
        Self(raw & Self::ADDRESS_MASK)
    }

    /// Возвращает физический адрес начала 4-КиБ области расширенного
    /// пространства конфигурации функции устройства, адресуемого
    /// `routing_id`.
    ///
    /// Смещение внутри области вызывающая сторона прибавляет сама.
    pub fn function_base(
        &self,
        routing_id: RoutingId,
    ) -> u64 {
        self.0 +
            (u64::from(routing_id.bus()) << 20) +
            (u64::from(routing_id.device()) << 15) +
            (u64::from(routing_id.function()) << 12)
    }

    /// Возвращает числовое значение базового адреса.
    pub fn address(&self) -> u64 {
        self.0
    }

    /// Маска битов базового адреса ECAM в значении регистра
    /// [`EcamBase::BASE_REGISTER_OFFSET`].
    const ADDRESS_MASK: u64 = 0x0000_000F_FC00_0000;

    /// Смещение регистра с базовым адресом ECAM в стандартном
    /// пространстве конфигурации корневого устройства `00:00.0`.
    pub const BASE_REGISTER_OFFSET: u32 = 0x60;

    /// Размер регистра с базовым адресом ECAM в байтах.
    pub const BASE_REGISTER_SIZE: usize = 8;
}
