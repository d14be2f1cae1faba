use crate::error::{
    Error::OutOfRange,
    Result,
};

/// Проверяет, что диапазон байт `[offset, offset + length)` целиком лежит
/// в пространстве конфигурации размера `space_size`.
///
/// Возвращает ошибку [`OutOfRange`], если диапазон выходит за границы
/// пространства. Переполнение суммы `offset + length` --- тоже выход за
/// границы, а не молчаливое усечение.
///
/// Не имеет побочных эффектов и вызывается до каждого обращения к
/// аппаратуре в обоих путях чтения.
pub fn validate_access(
    offset: u32,
    length: u32,
    space_size: u32,
) -> Result<()> {
    let error = OutOfRange {
        offset,
        length,
        space_size,
    };

    let end = offset.checked_add(length).ok_or(error)?;
    if end <= space_size {
        Ok(())
    } else {
        Err(error)
    }
}

/// Размер стандартного
/// [пространства конфигурации PCI](https://en.wikipedia.org/wiki/PCI_configuration_space)
/// одной функции устройства.
pub const LEGACY_CONFIG_SPACE_SIZE: u32 = 0x100;

/// Размер расширенного пространства конфигурации одной функции
/// устройства PCI Express, доступного через
/// [Enhanced Configuration Access Mechanism (ECAM)](https://en.wikipedia.org/wiki/PCI_Express#Hardware_protocol_summary).
pub const EXTENDED_CONFIG_SPACE_SIZE: u32 = 0x1000;
