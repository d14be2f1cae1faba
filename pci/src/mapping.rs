use core::{
    mem,
    ptr::NonNull,
};

use crate::{
    bounds::{
        EXTENDED_CONFIG_SPACE_SIZE,
        validate_access,
    },
    error::{
        Error::{
            DevicePoweredDown,
            InvalidParameter,
        },
        Result,
    },
};

/// Типаж отображения физической памяти устройств в адресное пространство
/// посредника для
/// [Memory--mapped I/O (MMIO)](https://en.wikipedia.org/wiki/Memory-mapped_I/O).
///
/// Реализуется платформой, на которой работает привилегированный посредник.
/// Отображение предназначено только для чтения и должно быть некэшируемым.
pub trait IoMapper {
    /// Отображает `size` байт физической памяти, начиная с адреса `base`.
    ///
    /// Возвращает ошибку [`crate::Error::MapFailed`],
    /// если ресурсов для отображения не хватает.
    ///
    /// # Safety
    ///
    /// Диапазон `[base, base + size)` должен указывать на память
    /// устройства, чтение которой не имеет побочных эффектов.
    unsafe fn map(
        &mut self,
        base: u64,
        size: usize,
    ) -> Result<NonNull<u8>>;

    /// Снимает отображение `window` размера `size`,
    /// ранее полученное от [`IoMapper::map()`].
    ///
    /// # Safety
    ///
    /// Пара `(window, size)` должна быть получена от [`IoMapper::map()`]
    /// этого же отобразителя, и отображение не должно быть снято ранее.
    unsafe fn unmap(
        &mut self,
        window: NonNull<u8>,
        size: usize,
    );
}

/// Отображённое окно физической памяти устройства.
///
/// Живёт строго в пределах одного чтения расширенного пространства:
/// захватывается непосредственно перед чтением и
/// гарантированно снимается при выходе из области видимости ---
/// на всех путях, включая ранние отказы.
struct MappedWindow<'a, M: IoMapper> {
    /// Отобразитель, которому окно будет возвращено.
    mapper: &'a mut M,

    /// Адрес начала окна.
    window: NonNull<u8>,

    /// Размер окна в байтах.
    size: usize,
}

impl<'a, M: IoMapper> MappedWindow<'a, M> {
    /// Отображает `size` байт физической памяти по адресу `base`.
    fn new(
        mapper: &'a mut M,
        base: u64,
        size: usize,
    ) -> Result<Self> {
        let window = unsafe { mapper.map(base, size)? };

        Ok(Self {
            mapper,
            window,
            size,
        })
    }

    /// Читает 32-битное слово с номером `index` от начала окна.
    fn read_dword(
        &self,
        index: usize,
    ) -> Result<u32> {
        let offset = index * mem::size_of::<u32>();
        if offset + mem::size_of::<u32>() > self.size {
            return Err(InvalidParameter);
        }

        let mut data = [0; mem::size_of::<u32>()];
        for (i, octet) in data.iter_mut().enumerate() {
            *octet = unsafe { self.window.as_ptr().add(offset + i).read_volatile() };
        }

        Ok(u32::from_le_bytes(data))
    }

    /// Копирует `buffer.len()` байт окна, начиная со смещения `offset`,
    /// в буфер `buffer`.
    ///
    /// Расхождение между запрошенным диапазоном и фактическим размером
    /// окна --- жёсткая ошибка валидации до копирования первого байта,
    /// а не повод довериться заявленной вызывающей стороной длине.
    fn copy_into(
        &self,
        offset: usize,
        buffer: &mut [u8],
    ) -> Result<()> {
        let end = offset.checked_add(buffer.len()).ok_or(InvalidParameter)?;
        if end > self.size {
            return Err(InvalidParameter);
        }

        for (i, octet) in buffer.iter_mut().enumerate() {
            *octet = unsafe { self.window.as_ptr().add(offset + i).read_volatile() };
        }

        Ok(())
    }
}

impl<M: IoMapper> Drop for MappedWindow<'_, M> {
    fn drop(&mut self) {
        unsafe { self.mapper.unmap(self.window, self.size) };
    }
}

/// Читает `buffer.len()` байт памяти устройства через отображение
/// 4-КиБ окна физической памяти по адресу `base`,
/// начиная со смещения `offset` внутри окна.
///
/// В отличие от побайтового чтения стандартного пространства конфигурации,
/// этот путь не имеет частичного успеха: либо заполняется весь буфер,
/// либо возвращается ошибка.
///
/// Первое слово *начала окна* проверяется на значение `0xFFFF_FFFF` ---
/// так аппаратура, не сигнализируя ошибку явно, отвечает за устройство,
/// находящееся в состоянии низкого энергопотребления.
/// В этом случае возвращается ошибка
/// [`crate::Error::DevicePoweredDown`],
/// и дальнейшие обращения к окну не выполняются.
pub fn read_extended(
    mapper: &mut impl IoMapper,
    base: u64,
    offset: u32,
    buffer: &mut [u8],
) -> Result<()> {
    validate_access(offset, buffer.len() as u32, EXTENDED_CONFIG_SPACE_SIZE)?;

    let window = MappedWindow::new(mapper, base, EXTENDED_CONFIG_SPACE_SIZE as usize)?;

    if window.read_dword(0)? == POWERED_DOWN_SENTINEL {
        return Err(DevicePoweredDown);
    }

    window.copy_into(offset as usize, buffer)
}

/// Значение первого слова окна, по которому распознаётся устройство
/// в состоянии низкого энергопотребления.
const POWERED_DOWN_SENTINEL: u32 = 0xFFFF_FFFF;
