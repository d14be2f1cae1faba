use tracing::warn;

use crate::{
    bounds::{
        LEGACY_CONFIG_SPACE_SIZE,
        validate_access,
    },
    error::Result,
    routing_id::RoutingId,
};

/// Типаж для работы со стандартным
/// [пространством конфигурации PCI](https://en.wikipedia.org/wiki/PCI_configuration_space).
///
/// Реализуется платформой, на которой работает привилегированный посредник.
pub trait ConfigSpace {
    /// Читает один байт по смещению `offset`
    /// в пространстве конфигурации устройства, адресуемого `routing_id`.
    ///
    /// Возвращает ошибку [`crate::Error::HardwareAccess`],
    /// если аппаратура не вернула ровно один байт.
    ///
    /// # Safety
    ///
    /// Определяется спецификацией шины и устройств PCI.
    unsafe fn read_octet(
        &mut self,
        routing_id: RoutingId,
        offset: u32,
    ) -> Result<u8>;
}

/// Читает `buffer.len()` байт стандартного пространства конфигурации
/// устройства `routing_id`, начиная со смещения `offset`.
///
/// Чтение выполняется побайтово.
/// Если очередной байт прочитать не удалось, чтение немедленно
/// останавливается, и функция возвращает количество байт,
/// успешно прочитанных к этому моменту, --- в том числе ноль.
/// Частично заполненный буфер --- это не ошибка:
/// исчезнувшее посреди сканирования устройство оставляет
/// диагностически ценный префикс.
///
/// Ошибкой является только выход диапазона
/// `[offset, offset + buffer.len())`
/// за границу [`LEGACY_CONFIG_SPACE_SIZE`] ---
/// в этом случае аппаратура не затрагивается вовсе.
pub fn read_legacy(
    config_space: &mut impl ConfigSpace,
    routing_id: RoutingId,
    offset: u32,
    buffer: &mut [u8],
) -> Result<usize> {
    let length = buffer.len() as u32;
    validate_access(offset, length, LEGACY_CONFIG_SPACE_SIZE)?;

    for i in 0 .. length {
        match unsafe { config_space.read_octet(routing_id, offset + i) } {
            Ok(octet) => buffer[i as usize] = octet,
            Err(error) => {
                warn!(
                    %routing_id,
                    offset,
                    obtained = i,
                    requested = length,
                    %error,
                    "legacy config space read truncated",
                );
                return Ok(i as usize);
            },
        }
    }

    Ok(length as usize)
}
