use crate::error::Result;

/// Типаж привилегированного канала, по которому пользовательская сессия
/// достигает посредника [`crate::Mediator`].
///
/// Сам транспорт --- забота платформы, эта библиотека его не реализует.
/// Канал эксклюзивен: открыть его может не более одного пользователя
/// одновременно, повторная попытка завершается ошибкой, а не ждёт в
/// очереди. Все вызовы блокирующие, без тайм-аутов --- зависшее
/// аппаратное чтение удерживает вызывающую сторону неограниченно долго.
pub trait Channel {
    /// Описатель открытого канала.
    type Handle;

    /// Открывает канал.
    ///
    /// Возвращает ошибку [`crate::Error::ChannelUnavailable`],
    /// если канал открыть не удалось --- например,
    /// он уже открыт другим пользователем.
    fn open(&mut self) -> Result<Self::Handle>;

    /// Закрывает описатель `handle`, завершая работу с каналом.
    fn close(
        &mut self,
        handle: Self::Handle,
    );

    /// Выполняет одну транзакцию с посредником:
    /// передаёт запрос `input` с кодом операции `op_code` и
    /// заполняет ответом буфер `output`.
    ///
    /// Возвращает количество байт ответа.
    /// Ошибки посредника доставляются без изменений;
    /// отказ самого транспорта --- это [`crate::Error::ChannelError`].
    fn transact(
        &mut self,
        handle: &mut Self::Handle,
        op_code: u16,
        input: &[u8],
        output: &mut [u8],
    ) -> Result<usize>;
}
