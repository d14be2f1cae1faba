use tracing::info;

use crate::{
    bounds::{
        EXTENDED_CONFIG_SPACE_SIZE,
        LEGACY_CONFIG_SPACE_SIZE,
        validate_access,
    },
    channel::Channel,
    ecam::EcamBase,
    error::{
        Error::{
            ChannelError,
            HardwareAccess,
            NotInitialized,
        },
        Result,
    },
    routing_id::RoutingId,
    wire::{
        ConfigRequest,
        MmioRequest,
        OpCode,
        qword,
    },
};

/// Пользовательская сессия доступа к регистрам конфигурации.
///
/// Сессия владеет привилегированным каналом до посредника и живёт
/// в двух состояниях.
/// Создаётся она неинициализированной --- любое чтение в этом состоянии
/// отвергается с ошибкой [`NotInitialized`] без обращений к каналу.
/// Вызов [`Session::initialize()`] открывает канал,
/// один раз вычисляет базовый адрес [`EcamBase`] и
/// переводит сессию в готовое состояние.
/// [`Session::shutdown()`] возвращает сессию в неинициализированное
/// состояние, освобождая описатель канала.
///
/// В один момент времени сессия обслуживает не более одной транзакции,
/// поэтому ей достаточно одного буфера обмена с каналом.
/// Последовательные чтения из одного потока канал заново не открывают.
pub struct Session<C: Channel> {
    /// Привилегированный канал до посредника.
    channel: C,

    /// Состояние готовой сессии; [`None`] --- сессия не инициализирована.
    ready: Option<Ready<C::Handle>>,

    /// Буфер одной транзакции с посредником.
    scratch: [u8; TRANSACT_BUFFER_SIZE],
}

/// Состояние инициализированной сессии.
struct Ready<H> {
    /// Описатель открытого канала.
    handle: H,

    /// Вычисленный при инициализации базовый адрес области ECAM.
    ecam_base: EcamBase,
}

impl<C: Channel> Session<C> {
    /// Создаёт неинициализированную сессию над каналом `channel`.
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            ready: None,
            scratch: [0; TRANSACT_BUFFER_SIZE],
        }
    }

    /// Инициализирует сессию: открывает привилегированный канал,
    /// читает регистр [`EcamBase::BASE_REGISTER_OFFSET`]
    /// корневого устройства `00:00.0` и
    /// запоминает вычисленный из него базовый адрес [`EcamBase`].
    ///
    /// Если канал открыть не удалось или регистр прочитался не целиком,
    /// сессия остаётся неинициализированной, а описатель канала ---
    /// закрытым. Для уже инициализированной сессии ничего не делает;
    /// пересчитать [`EcamBase`] можно, только завершив сессию
    /// вызовом [`Session::shutdown()`] и инициализировав её заново.
    pub fn initialize(&mut self) -> Result<()> {
        if self.ready.is_some() {
            return Ok(());
        }

        let mut handle = self.channel.open()?;

        let ecam_base = match Self::read_ecam_base(&mut self.channel, &mut handle, &mut self.scratch) {
            Ok(ecam_base) => ecam_base,
            Err(error) => {
                self.channel.close(handle);
                return Err(error);
            },
        };

        info!(%ecam_base, "register access session initialized");

        self.ready = Some(Ready { handle, ecam_base });

        Ok(())
    }

    /// Читает регистр с базовым адресом области ECAM и
    /// возвращает вычисленный [`EcamBase`].
    ///
    /// Регистр должен прочитаться целиком,
    /// частичный результат здесь --- ошибка [`HardwareAccess`].
    fn read_ecam_base(
        channel: &mut C,
        handle: &mut C::Handle,
        scratch: &mut [u8],
    ) -> Result<EcamBase> {
        let length = EcamBase::BASE_REGISTER_SIZE;
        let request = ConfigRequest::new(
            RoutingId::new(0, 0, 0),
            EcamBase::BASE_REGISTER_OFFSET,
            length as u32,
        );

        let mut input = [0; ConfigRequest::SIZE];
        request.encode(&mut input)?;

        let output = &mut scratch[.. ConfigRequest::SIZE + length];
        channel.transact(handle, OpCode::ConfigRead.into(), &input, output)?;

        let response = ConfigRequest::decode(&output[.. ConfigRequest::SIZE])?;
        if *response.length() as usize != length {
            return Err(HardwareAccess);
        }

        Ok(EcamBase::resolve(qword(output, ConfigRequest::SIZE)))
    }

    /// Возвращает вычисленный при инициализации базовый адрес области ECAM.
    pub fn ecam_base(&self) -> Result<EcamBase> {
        self.ready
            .as_ref()
            .map(|ready| ready.ecam_base)
            .ok_or(NotInitialized)
    }

    /// Читает `buffer.len()` байт стандартного 256-байтового пространства
    /// конфигурации устройства `routing_id`, начиная со смещения `offset`.
    ///
    /// Возвращает количество фактически прочитанных байт.
    /// Оно может оказаться меньше запрошенного --- вплоть до нуля ---
    /// если устройство перестало отвечать посреди чтения;
    /// частичный префикс буфера при этом корректен.
    pub fn read_config(
        &mut self,
        routing_id: RoutingId,
        offset: u32,
        buffer: &mut [u8],
    ) -> Result<usize> {
        let ready = self.ready.as_mut().ok_or(NotInitialized)?;

        let length = buffer.len();
        validate_access(offset, length as u32, LEGACY_CONFIG_SPACE_SIZE)?;

        let request = ConfigRequest::new(routing_id, offset, length as u32);
        let mut input = [0; ConfigRequest::SIZE];
        request.encode(&mut input)?;

        let output = &mut self.scratch[.. ConfigRequest::SIZE + length];
        self.channel
            .transact(&mut ready.handle, OpCode::ConfigRead.into(), &input, output)?;

        let response = ConfigRequest::decode(&output[.. ConfigRequest::SIZE])?;
        let obtained = *response.length() as usize;
        if obtained > length {
            return Err(ChannelError);
        }

        buffer[.. obtained]
            .copy_from_slice(&output[ConfigRequest::SIZE .. ConfigRequest::SIZE + obtained]);

        Ok(obtained)
    }

    /// Читает `buffer.len()` байт расширенного 4-КиБ пространства
    /// конфигурации устройства `routing_id`, начиная со смещения `offset`.
    ///
    /// Физический адрес области вычисляется самой сессией из
    /// запомненного [`EcamBase`] --- подменить его для адресуемого
    /// координатами чтения вызывающая сторона не может.
    /// Частичных результатов у этого пути не бывает:
    /// либо буфер заполнен целиком, либо возвращается ошибка.
    pub fn read_extended_config(
        &mut self,
        routing_id: RoutingId,
        offset: u32,
        buffer: &mut [u8],
    ) -> Result<()> {
        let ready = self.ready.as_ref().ok_or(NotInitialized)?;

        validate_access(offset, buffer.len() as u32, EXTENDED_CONFIG_SPACE_SIZE)?;

        let base_address = ready.ecam_base.function_base(routing_id);

        self.mmio_transact(base_address, offset, buffer)
    }

    /// Читает `buffer.len()` байт окна
    /// [Memory--mapped I/O (MMIO)](https://en.wikipedia.org/wiki/Memory-mapped_I/O)
    /// по явному физическому адресу `base_address`,
    /// начиная со смещения `offset` внутри окна.
    ///
    /// Сознательно низкоуровневая операция с меньшим уровнем доверия:
    /// за корректность базового адреса отвечает вызывающая сторона.
    pub fn read_mmio(
        &mut self,
        base_address: u64,
        offset: u32,
        buffer: &mut [u8],
    ) -> Result<()> {
        if self.ready.is_none() {
            return Err(NotInitialized);
        }

        validate_access(offset, buffer.len() as u32, EXTENDED_CONFIG_SPACE_SIZE)?;

        self.mmio_transact(base_address, offset, buffer)
    }

    /// Выполняет транзакцию чтения окна MMIO и
    /// переносит данные ответа в буфер вызывающей стороны.
    fn mmio_transact(
        &mut self,
        base_address: u64,
        offset: u32,
        buffer: &mut [u8],
    ) -> Result<()> {
        let ready = self.ready.as_mut().ok_or(NotInitialized)?;

        let length = buffer.len();
        let request = MmioRequest::new(base_address, offset, length as u32);
        let mut input = [0; MmioRequest::SIZE];
        request.encode(&mut input)?;

        let output = &mut self.scratch[.. MmioRequest::SIZE + length];
        self.channel
            .transact(&mut ready.handle, OpCode::MmioRead.into(), &input, output)?;

        let response = MmioRequest::decode(&output[.. MmioRequest::SIZE])?;
        if *response.length() as usize != length {
            return Err(HardwareAccess);
        }

        buffer.copy_from_slice(&output[MmioRequest::SIZE .. MmioRequest::SIZE + length]);

        Ok(())
    }

    /// Завершает сессию, закрывая описатель канала.
    ///
    /// Последующие чтения отвергаются с ошибкой [`NotInitialized`],
    /// пока сессия не будет инициализирована заново.
    pub fn shutdown(&mut self) {
        if let Some(ready) = self.ready.take() {
            self.channel.close(ready.handle);
        }
    }
}

impl<C: Channel> Drop for Session<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Размер буфера одной транзакции с посредником:
/// худший случай --- ответ на чтение целого расширенного пространства
/// конфигурации.
const TRANSACT_BUFFER_SIZE: usize = MmioRequest::SIZE + EXTENDED_CONFIG_SPACE_SIZE as usize;
