#![allow(dead_code)]
#![allow(unused_imports)]
#![allow(unused_variables)]

//! Библиотека доступа к регистрам конфигурации шин
//! [PCI (Peripheral Component Interconnect)](https://en.wikipedia.org/wiki/Peripheral_Component_Interconnect)
//! и
//! [PCI Express (Peripheral Component Interconnect Express)](https://en.wikipedia.org/wiki/PCI_Express)
//! через привилегированного посредника.
//!
//! Пользовательский код строит запросы и отправляет их посреднику по
//! эксклюзивному привилегированному каналу, см. [`Session`] и [`Channel`].
//! Посредник [`Mediator`] проверяет каждый запрос до какого-либо обращения
//! к аппаратуре и выполняет чтение либо из стандартного 256-байтового
//! [пространства конфигурации PCI](https://en.wikipedia.org/wiki/PCI_configuration_space),
//! либо из расширенного 4-КиБ пространства через
//! [Enhanced Configuration Access Mechanism (ECAM)](https://en.wikipedia.org/wiki/PCI_Express#Hardware_protocol_summary).
//! Запись регистров не поддерживается.

#![deny(warnings)]
#![no_std]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(missing_docs)]

pub use bounds::{
    EXTENDED_CONFIG_SPACE_SIZE,
    LEGACY_CONFIG_SPACE_SIZE,
    validate_access,
};
pub use channel::Channel;
pub use config_space::{
    ConfigSpace,
    read_legacy,
};
pub use ecam::EcamBase;
pub use error::{
    Error,
    Result,
};
pub use mapping::{
    IoMapper,
    read_extended,
};
pub use mediator::Mediator;
pub use routing_id::RoutingId;
pub use session::Session;
pub use wire::{
    ConfigRequest,
    MmioRequest,
    OpCode,
};

/// Проверка границ запрошенного диапазона регистров.
mod bounds;

/// Типаж привилегированного канала до посредника.
mod channel;

/// Модуль для работы со стандартным
/// [пространством конфигурации PCI](https://en.wikipedia.org/wiki/PCI_configuration_space).
mod config_space;

/// Вычисление физических адресов области
/// [Enhanced Configuration Access Mechanism (ECAM)](https://en.wikipedia.org/wiki/PCI_Express#Hardware_protocol_summary).
mod ecam;

/// Перечисление возможных ошибок.
mod error;

/// Отображение физической памяти для
/// [Memory--mapped I/O (MMIO)](https://en.wikipedia.org/wiki/Memory-mapped_I/O)
/// и чтение расширенного пространства конфигурации.
mod mapping;

/// Привилегированный посредник, обслуживающий запросы чтения регистров.
mod mediator;

/// Географические координаты PCI--устройства.
mod routing_id;

/// Пользовательская сессия доступа к регистрам.
mod session;

/// Структуры запросов и ответов, передаваемые по каналу.
mod wire;

#[cfg(test)]
mod test;
