use core::mem;

use derive_getters::Getters;
use derive_more::Display;
use num_enum::{
    IntoPrimitive,
    TryFromPrimitive,
};
use static_assertions::const_assert_eq;

use crate::{
    error::{
        Error::InvalidParameter,
        Result,
    },
    routing_id::RoutingId,
};

/// Код операции, различающий запросы на привилегированном канале.
#[derive(Clone, Copy, Debug, Eq, IntoPrimitive, PartialEq, TryFromPrimitive)]
#[repr(u16)]
pub enum OpCode {
    /// Чтение стандартного 256-байтового
    /// [пространства конфигурации PCI](https://en.wikipedia.org/wiki/PCI_configuration_space)
    /// по географическим координатам устройства,
    /// см. [`ConfigRequest`].
    ConfigRead = 0x801,

    /// Чтение окна
    /// [Memory--mapped I/O (MMIO)](https://en.wikipedia.org/wiki/Memory-mapped_I/O)
    /// по явному физическому адресу, см. [`MmioRequest`].
    MmioRead = 0x802,
}

/// Запрос чтения диапазона регистров стандартного пространства
/// конфигурации устройства, адресуемого географическими координатами.
///
/// В сериализованном виде --- плотно упакованная структура фиксированного
/// размера [`ConfigRequest::SIZE`] с полями в порядке объявления и
/// числами от младшего байта к старшему.
/// Ответ использует ту же структуру,
/// но поле `length` в нём перезаписано количеством фактически
/// прочитанных байт, а сразу за заголовком следуют сами данные.
#[derive(Clone, Copy, Debug, Display, Eq, Getters, PartialEq)]
#[display("device {routing_id}, offset {offset:#X}, length {length:#X}")]
pub struct ConfigRequest {
    /// Географические координаты целевого устройства.
    routing_id: RoutingId,

    /// Смещение начала диапазона в пространстве конфигурации.
    offset: u32,

    /// Количество запрошенных байт;
    /// в ответе --- количество фактически прочитанных.
    length: u32,
}

impl ConfigRequest {
    /// Создаёт запрос чтения `length` байт пространства конфигурации
    /// устройства `routing_id`, начиная со смещения `offset`.
    pub fn new(
        routing_id: RoutingId,
        offset: u32,
        length: u32,
    ) -> Self {
        Self {
            routing_id,
            offset,
            length,
        }
    }

    /// Возвращает копию запроса с полем `length`,
    /// перезаписанным количеством фактически прочитанных байт ---
    /// заголовок ответа.
    pub fn with_length(
        mut self,
        length: u32,
    ) -> Self {
        self.length = length;

        self
    }

    /// Сериализует запрос в буфер `buffer`,
    /// размер которого должен быть равен в точности [`ConfigRequest::SIZE`].
    pub fn encode(
        &self,
        buffer: &mut [u8],
    ) -> Result<()> {
        if buffer.len() != Self::SIZE {
            return Err(InvalidParameter);
        }

        buffer[BUS_FIELD] = self.routing_id.bus();
        buffer[DEVICE_FIELD] = self.routing_id.device();
        buffer[FUNCTION_FIELD] = self.routing_id.function();
        buffer[CONFIG_OFFSET_FIELD .. CONFIG_LENGTH_FIELD]
            .copy_from_slice(&self.offset.to_le_bytes());
        buffer[CONFIG_LENGTH_FIELD .. Self::SIZE].copy_from_slice(&self.length.to_le_bytes());

        Ok(())
    }

    /// Десериализует запрос из буфера `buffer`,
    /// размер которого должен быть равен в точности [`ConfigRequest::SIZE`].
    pub fn decode(buffer: &[u8]) -> Result<Self> {
        if buffer.len() != Self::SIZE {
            return Err(InvalidParameter);
        }

        let routing_id = RoutingId::new(
            buffer[BUS_FIELD],
            buffer[DEVICE_FIELD],
            buffer[FUNCTION_FIELD],
        );
        let offset = dword(buffer, CONFIG_OFFSET_FIELD);
        let length = dword(buffer, CONFIG_LENGTH_FIELD);

        Ok(Self::new(routing_id, offset, length))
    }

    /// Размер сериализованного запроса в байтах.
    pub const SIZE: usize = CONFIG_LENGTH_FIELD + mem::size_of::<u32>();
}

/// Запрос чтения диапазона байт окна
/// [Memory--mapped I/O (MMIO)](https://en.wikipedia.org/wiki/Memory-mapped_I/O)
/// по явному физическому адресу.
///
/// Это сознательно низкоуровневая операция с меньшим уровнем доверия:
/// базовый адрес задаёт вызывающая сторона,
/// посредник лишь проверяет границы диапазона внутри окна.
/// Сериализация устроена так же, как у [`ConfigRequest`];
/// частичных ответов у этой операции не бывает.
#[derive(Clone, Copy, Debug, Display, Eq, Getters, PartialEq)]
#[display("base address {base_address:#X}, offset {offset:#X}, length {length:#X}")]
pub struct MmioRequest {
    /// Физический адрес начала окна.
    base_address: u64,

    /// Смещение начала диапазона внутри окна.
    offset: u32,

    /// Количество запрошенных байт.
    length: u32,
}

impl MmioRequest {
    /// Создаёт запрос чтения `length` байт окна MMIO
    /// с физическим базовым адресом `base_address`,
    /// начиная со смещения `offset` внутри окна.
    pub fn new(
        base_address: u64,
        offset: u32,
        length: u32,
    ) -> Self {
        Self {
            base_address,
            offset,
            length,
        }
    }

    /// Сериализует запрос в буфер `buffer`,
    /// размер которого должен быть равен в точности [`MmioRequest::SIZE`].
    pub fn encode(
        &self,
        buffer: &mut [u8],
    ) -> Result<()> {
        if buffer.len() != Self::SIZE {
            return Err(InvalidParameter);
        }

        buffer[BASE_ADDRESS_FIELD .. MMIO_OFFSET_FIELD]
            .copy_from_slice(&self.base_address.to_le_bytes());
        buffer[MMIO_OFFSET_FIELD .. MMIO_LENGTH_FIELD]
            .copy_from_slice(&self.offset.to_le_bytes());
        buffer[MMIO_LENGTH_FIELD .. Self::SIZE].copy_from_slice(&self.length.to_le_bytes());

        Ok(())
    }

    /// Десериализует запрос из буфера `buffer`,
    /// размер которого должен быть равен в точности [`MmioRequest::SIZE`].
    pub fn decode(buffer: &[u8]) -> Result<Self> {
        if buffer.len() != Self::SIZE {
            return Err(InvalidParameter);
        }

        let base_address = qword(buffer, BASE_ADDRESS_FIELD);
        let offset = dword(buffer, MMIO_OFFSET_FIELD);
        let length = dword(buffer, MMIO_LENGTH_FIELD);

        Ok(Self::new(base_address, offset, length))
    }

    /// Размер сериализованного запроса в байтах.
    pub const SIZE: usize = MMIO_LENGTH_FIELD + mem::size_of::<u32>();
}

/// Читает 32-битное число из сериализованного представления `buffer`
/// по смещению `field`, от младшего байта к старшему.
fn dword(
    buffer: &[u8],
    field: usize,
) -> u32 {
    let mut data = 0;
    for i in (field .. field + mem::size_of::<u32>()).rev() {
        data = (data << u8::BITS) | u32::from(buffer[i]);
    }

    data
}

/// Читает 64-битное число из сериализованного представления `buffer`
/// по смещению `field`, от младшего байта к старшему.
pub(crate) fn qword(
    buffer: &[u8],
    field: usize,
) -> u64 {
    let mut data = 0;
    for i in (field .. field + mem::size_of::<u64>()).rev() {
        data = (data << u8::BITS) | u64::from(buffer[i]);
    }

    data
}

/// Смещение номера шины в сериализованном [`ConfigRequest`].
const BUS_FIELD: usize = 0;

/// Смещение номера устройства в сериализованном [`ConfigRequest`].
const DEVICE_FIELD: usize = 1;

/// Смещение номера функции в сериализованном [`ConfigRequest`].
const FUNCTION_FIELD: usize = 2;

/// Смещение поля `offset` в сериализованном [`ConfigRequest`].
const CONFIG_OFFSET_FIELD: usize = 3;

/// Смещение поля `length` в сериализованном [`ConfigRequest`].
const CONFIG_LENGTH_FIELD: usize = CONFIG_OFFSET_FIELD + mem::size_of::<u32>();

/// Смещение физического адреса в сериализованном [`MmioRequest`].
const BASE_ADDRESS_FIELD: usize = 0;

/// Смещение поля `offset` в сериализованном [`MmioRequest`].
const MMIO_OFFSET_FIELD: usize = BASE_ADDRESS_FIELD + mem::size_of::<u64>();

/// Смещение поля `length` в сериализованном [`MmioRequest`].
const MMIO_LENGTH_FIELD: usize = MMIO_OFFSET_FIELD + mem::size_of::<u32>();

const_assert_eq!(ConfigRequest::SIZE, 11);
const_assert_eq!(MmioRequest::SIZE, 16);
