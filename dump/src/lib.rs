#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(unused_variables)]

//! Библиотека диагностической печати пространств конфигурации устройств
//! [PCI](https://en.wikipedia.org/wiki/Peripheral_Component_Interconnect)
//! и
//! [PCI Express](https://en.wikipedia.org/wiki/PCI_Express)
//! в виде шестнадцатеричной таблицы.
//!
//! Список устройств поставляет внешний перечислитель платформы,
//! сами регистры читаются через сессию [`pci::Session`].
//! Неудача чтения одного устройства не прерывает печать остальных.

#![deny(warnings)]
#![no_std]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(missing_docs)]

use core::fmt::Write;

use derive_getters::Getters;
use derive_more::Display;
use pci_ids::{
    Device,
    FromId,
    Vendor,
};

use pci::{
    Channel,
    EXTENDED_CONFIG_SPACE_SIZE,
    Error,
    LEGACY_CONFIG_SPACE_SIZE,
    Result,
    RoutingId,
    Session,
};


/// Описание обнаруженного устройства,
/// в том виде, в котором его выдаёт внешний перечислитель платформы.
#[derive(Clone, Copy, Debug, Display, Getters)]
#[display(
    "Device: {}, Bus: {:#x}, Device: {:#x}, Function: {:#x}",
    name,
    routing_id.bus(),
    routing_id.device(),
    routing_id.function()
)]
pub struct DeviceInfo<'a> {
    /// Отображаемое имя устройства.
    name: &'a str,

    /// Географические координаты устройства.
    routing_id: RoutingId,
}

impl<'a> DeviceInfo<'a> {
    /// Создаёт описание устройства с именем `name` и
    /// географическими координатами `routing_id`.
    pub fn new(
        name: &'a str,
        routing_id: RoutingId,
    ) -> Self {
        Self { name, routing_id }
    }
}

/// Проверяет, отвечает ли устройство `routing_id` на чтения
/// пространства конфигурации.
///
/// Для этого читает первое 32-битное слово пространства конфигурации и
/// возвращает `true`, только если оно прочиталось целиком.
pub fn probe<C: Channel>(
    session: &mut Session<C>,
    routing_id: RoutingId,
) -> Result<bool> {
    let mut header = [0; 4];
    let obtained = session.read_config(routing_id, 0, &mut header)?;

    Ok(obtained == header.len())
}

/// Печатает в `writer` стандартное 256-байтовое пространство конфигурации
/// устройства `device` в виде шестнадцатеричной таблицы.
///
/// Если устройство перестало отвечать посреди чтения,
/// печатается прочитанный префикс --- частичный результат остаётся
/// корректными данными.
pub fn dump_config_space<C: Channel>(
    session: &mut Session<C>,
    device: &DeviceInfo<'_>,
    writer: &mut impl Write,
) -> Result<()> {
    writeln!(writer, "{device}")?;

    let mut buffer = [0; LEGACY_CONFIG_SPACE_SIZE as usize];
    let obtained = session.read_config(*device.routing_id(), 0, &mut buffer)?;

    describe_function(&buffer[.. obtained], writer)?;
    write_grid(writer, &buffer[.. obtained], LEGACY_ROW_LABEL_WIDTH)
}

/// Печатает в `writer` расширенное 4-КиБ пространство конфигурации
/// устройства `device` в виде шестнадцатеричной таблицы.
///
/// Частичных результатов у расширенного чтения не бывает:
/// либо печатается вся таблица, либо возвращается ошибка.
pub fn dump_extended_config_space<C: Channel>(
    session: &mut Session<C>,
    device: &DeviceInfo<'_>,
    writer: &mut impl Write,
) -> Result<()> {
    writeln!(writer, "{device}")?;

    let mut buffer = [0; EXTENDED_CONFIG_SPACE_SIZE as usize];
    session.read_extended_config(*device.routing_id(), 0, &mut buffer)?;

    write_grid(writer, &buffer, EXTENDED_ROW_LABEL_WIDTH)
}

/// Печатает в `writer` пространства конфигурации всех устройств `devices`:
/// сначала стандартные, затем расширенные.
///
/// Неудача чтения одного устройства печатается как диагностика и
/// не прерывает обход остальных.
/// Фатальны только неинициализированная сессия и отказ самого `writer`.
pub fn dump_all<C: Channel>(
    session: &mut Session<C>,
    devices: &[DeviceInfo<'_>],
    writer: &mut impl Write,
) -> Result<()> {
    for device in devices {
        if let Err(error) = dump_config_space(session, device, writer) {
            match error {
                Error::NotInitialized | Error::Fmt(_) => return Err(error),
                _ => writeln!(writer, "Unable to read the standard config space, Error: {error}")?,
            }
        }
        write_separator(writer)?;
    }

    for device in devices {
        if let Err(error) = dump_extended_config_space(session, device, writer) {
            match error {
                Error::NotInitialized | Error::Fmt(_) => return Err(error),
                _ => writeln!(writer, "Unable to read the extended config space, Error: {error}")?,
            }
        }
        write_separator(writer)?;
    }

    Ok(())
}

/// Печатает в `writer` имена производителя и устройства из базы
/// идентификаторов PCI по первому слову `header` пространства
/// конфигурации.
///
/// Если слово прочитано не целиком, либо в нём нет устройства,
/// не печатает ничего.
/// Для идентификаторов, отсутствующих в базе,
/// печатает их числовые значения.
fn describe_function(
    header: &[u8],
    writer: &mut impl Write,
) -> Result<()> {
    if header.len() < 4 {
        return Ok(());
    }

    let vendor_id = u16::from_le_bytes([header[0], header[1]]);
    let device_id = u16::from_le_bytes([header[2], header[3]]);

    if vendor_id == NO_FUNCTION {
        return Ok(());
    }

    match Vendor::from_id(vendor_id) {
        Some(vendor) => write!(writer, "Vendor: {}", vendor.name())?,
        None => write!(writer, "Vendor: {vendor_id:#06X}")?,
    }

    match Device::from_vid_pid(vendor_id, device_id) {
        Some(device) => writeln!(writer, ", Device: {}", device.name())?,
        None => writeln!(writer, ", Device: {device_id:#06X}")?,
    }

    Ok(())
}

/// Печатает в `writer` байты `bytes` в виде шестнадцатеричной таблицы
/// по [`ROW_LENGTH`] байт в строке.
///
/// Каждая строка начинается с метки ---
/// смещения её первого байта шириной `label_width` цифр.
fn write_grid(
    writer: &mut impl Write,
    bytes: &[u8],
    label_width: usize,
) -> Result<()> {
    for _ in 0 .. label_width + 1 {
        write!(writer, " ")?;
    }
    for column in 0 .. ROW_LENGTH {
        if column > 0 {
            write!(writer, " ")?;
        }
        write!(writer, "{column:02X}")?;
    }
    writeln!(writer)?;

    for _ in 2 .. label_width {
        write!(writer, " ")?;
    }
    for separator in 0 ..= ROW_LENGTH {
        if separator > 0 {
            write!(writer, " ")?;
        }
        write!(writer, "--")?;
    }
    writeln!(writer)?;

    for (row, chunk) in bytes.chunks(ROW_LENGTH).enumerate() {
        write!(writer, "{:0width$X}|", row * ROW_LENGTH, width = label_width)?;
        for octet in chunk {
            write!(writer, "{octet:02X} ")?;
        }
        writeln!(writer)?;
    }

    Ok(())
}

/// Печатает в `writer` разделитель между устройствами.
fn write_separator(writer: &mut impl Write) -> Result<()> {
    writeln!(writer)?;
    for _ in 0 .. SEPARATOR_LENGTH {
        write!(writer, "*")?;
    }
    writeln!(writer)?;
    writeln!(writer)?;

    Ok(())
}

/// Количество байт в одной строке таблицы.
const ROW_LENGTH: usize = 0x10;

/// Ширина метки строки таблицы стандартного пространства конфигурации.
const LEGACY_ROW_LABEL_WIDTH: usize = 2;

/// Ширина метки строки таблицы расширенного пространства конфигурации.
const EXTENDED_ROW_LABEL_WIDTH: usize = 3;

/// Длина разделителя между устройствами.
const SEPARATOR_LENGTH: usize = 100;

/// Значение идентификатора производителя,
/// означающее отсутствие функции устройства.
const NO_FUNCTION: u16 = u16::MAX;
