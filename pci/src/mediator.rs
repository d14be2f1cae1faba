use tracing::{
    debug,
    error,
};

use crate::{
    config_space::{
        ConfigSpace,
        read_legacy,
    },
    error::{
        Error::{
            InvalidParameter,
            UnsupportedOperation,
        },
        Result,
    },
    mapping::{
        IoMapper,
        read_extended,
    },
    wire::{
        ConfigRequest,
        MmioRequest,
        OpCode,
    },
};

/// Привилегированный посредник, обслуживающий запросы чтения регистров.
///
/// Владеет обоими аппаратными интерфейсами платформы и обслуживает
/// по одному запросу за раз --- эксклюзивность обеспечивает канал.
/// Каждый запрос проверяется целиком до первого обращения к аппаратуре.
pub struct Mediator<C: ConfigSpace, M: IoMapper> {
    /// Доступ к стандартному пространству конфигурации.
    config_space: C,

    /// Отображение физической памяти устройств.
    mapper: M,
}

impl<C: ConfigSpace, M: IoMapper> Mediator<C, M> {
    /// Создаёт посредника над аппаратными интерфейсами платформы.
    pub fn new(
        config_space: C,
        mapper: M,
    ) -> Self {
        Self {
            config_space,
            mapper,
        }
    }

    /// Обслуживает одну транзакцию:
    /// разбирает запрос `input` с кодом операции `op_code`,
    /// выполняет чтение и заполняет ответом буфер `output`.
    ///
    /// Возвращает количество байт ответа.
    /// Запрос с нераспознанным кодом операции отвергается с ошибкой
    /// [`UnsupportedOperation`] без каких-либо данных в ответе.
    pub fn dispatch(
        &mut self,
        op_code: u16,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize> {
        if input.is_empty() || output.is_empty() {
            error!(op_code, "empty request or response buffer");
            return Err(InvalidParameter);
        }

        match OpCode::try_from(op_code) {
            Ok(OpCode::ConfigRead) => self.config_read(input, output),
            Ok(OpCode::MmioRead) => self.mmio_read(input, output),
            Err(_) => {
                error!(op_code, "unrecognized operation code");
                Err(UnsupportedOperation(op_code))
            },
        }
    }

    /// Обслуживает чтение стандартного пространства конфигурации.
    ///
    /// Размер `input` должен равняться в точности размеру заголовка
    /// запроса, а размер `output` --- размеру заголовка плюс заявленной
    /// в запросе длине данных, иначе запрос отвергается с ошибкой
    /// [`InvalidParameter`] до какого-либо обращения к аппаратуре.
    ///
    /// В заголовке ответа поле длины перезаписывается количеством
    /// фактически прочитанных байт --- оно может оказаться меньше
    /// запрошенного, если устройство перестало отвечать посреди чтения.
    fn config_read(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize> {
        let request = ConfigRequest::decode(input)?;
        debug!(%request, "standard config space read");

        let length = *request.length() as usize;
        if output.len() != ConfigRequest::SIZE + length {
            error!(
                %request,
                output_len = output.len(),
                "response buffer capacity does not match the declared length",
            );
            return Err(InvalidParameter);
        }

        let (header, data) = output.split_at_mut(ConfigRequest::SIZE);
        let obtained = read_legacy(
            &mut self.config_space,
            *request.routing_id(),
            *request.offset(),
            data,
        )?;

        request.with_length(obtained as u32).encode(header)?;

        Ok(ConfigRequest::SIZE + obtained)
    }

    /// Обслуживает чтение окна
    /// [Memory--mapped I/O (MMIO)](https://en.wikipedia.org/wiki/Memory-mapped_I/O)
    /// по явному физическому адресу.
    ///
    /// Дисциплина размеров буферов та же, что и у
    /// [`Mediator::config_read()`].
    /// Частичных ответов не бывает: либо ответ несёт все запрошенные
    /// байты, либо запрос завершается ошибкой.
    fn mmio_read(
        &mut self,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize> {
        let request = MmioRequest::decode(input)?;
        debug!(%request, "MMIO window read");

        let length = *request.length() as usize;
        if output.len() != MmioRequest::SIZE + length {
            error!(
                %request,
                output_len = output.len(),
                "response buffer capacity does not match the declared length",
            );
            return Err(InvalidParameter);
        }

        let (header, data) = output.split_at_mut(MmioRequest::SIZE);
        read_extended(
            &mut self.mapper,
            *request.base_address(),
            *request.offset(),
            data,
        )?;

        request.encode(header)?;

        Ok(MmioRequest::SIZE + length)
    }
}
