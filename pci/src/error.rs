use core::{
    fmt,
    result,
};

use derive_more::Display;

/// Перечисление для возможных ошибок.
///
/// Каждый вариант несёт диагностическое сообщение, предназначенное для
/// показа оператору, --- см. реализацию [`core::fmt::Display`].
#[derive(Clone, Copy, Debug, Display, Eq, PartialEq)]
pub enum Error {
    /// Транзакция на привилегированном канале завершилась неудачей.
    #[display("privileged channel transaction failed")]
    ChannelError,

    /// Привилегированный канал недоступен.
    /// Например, он уже эксклюзивно открыт другим пользователем.
    #[display("unable to open the privileged channel")]
    ChannelUnavailable,

    /// Устройство находится в состоянии низкого энергопотребления и
    /// отвечает на чтения по
    /// [MMIO](https://en.wikipedia.org/wiki/Memory-mapped_I/O)
    /// одними единичными битами.
    #[display("MMIO access requested while the device is powered down")]
    DevicePoweredDown,

    /// Ошибка форматирования сообщения.
    #[display("formatting failed")]
    Fmt(fmt::Error),

    /// Аппаратное чтение не вернуло ожидаемое количество байт.
    #[display("hardware did not return the expected byte count")]
    HardwareAccess,

    /// Некорректный запрос: размер буфера не согласован с заявленной
    /// длиной данных.
    #[display("request and response buffer sizes are inconsistent")]
    InvalidParameter,

    /// Не удалось отобразить физическую память устройства.
    #[display("unable to map the physical region")]
    MapFailed,

    /// Операция запрошена до инициализации сессии либо после её завершения.
    #[display("the session is not initialized")]
    NotInitialized,

    /// Запрошенный диапазон регистров выходит за границы адресуемого
    /// пространства конфигурации.
    #[display(
        "requested offset {offset:#X}, data length {length:#X} is out of range, \
         the configuration space size is {space_size:#X} bytes only"
    )]
    OutOfRange {
        /// Смещение начала запрошенного диапазона.
        offset: u32,

        /// Длина запрошенного диапазона в байтах.
        length: u32,

        /// Размер адресуемого пространства конфигурации в байтах.
        space_size: u32,
    },

    /// Код операции не распознан посредником.
    #[display("unrecognized operation code {_0:#X}")]
    UnsupportedOperation(u16),
}

impl From<fmt::Error> for Error {
    fn from(error: fmt::Error) -> Self {
        Error::Fmt(error)
    }
}

/// Тип возвращаемого результата `T` или ошибки [`Error`] ---
/// мономорфизация [`result::Result`] по типу ошибки.
pub type Result<T> = result::Result<T, Error>;
