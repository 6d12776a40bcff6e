//! Thin typed facades for the common module classes.
//!
//! A facade binds a chain position after checking the resolved variant's
//! class code and exposes the handful of operations that class is used for,
//! with well-known parameter ids pre-bound. Everything here delegates to
//! [`Coupler`]; modules without a facade remain fully usable through the
//! generic surface.

use crate::chain::Coupler;
use crate::codec::ProcessValue;
use crate::descriptor::DataKind;
use crate::hal::{FieldbusError, RegisterTransport};
use alloc::vec::Vec;

/// Class codes carried by descriptor variants.
pub mod class {
    pub const DIGITAL_IN: &str = "DI";
    pub const DIGITAL_OUT: &str = "DO";
    pub const ANALOG_IN: &str = "AI";
    pub const ANALOG_OUT: &str = "AO";
    pub const IO_LINK_MASTER: &str = "IOL";
}

/// Well-known parameter ids shared across module generations.
pub mod parameter_id {
    /// Per-channel input filter / debounce selection.
    pub const INPUT_FILTER: u16 = 2;
    /// Per-channel substitute value strategy on bus failure.
    pub const FAILSAFE_MODE: u16 = 3;
    /// Per-channel measurement range selection (analog classes).
    pub const MEASUREMENT_RANGE: u16 = 4;
    /// Per-port operating mode (IO-Link master).
    pub const PORT_MODE: u16 = 8;
}

fn bind_class<T: RegisterTransport>(
    coupler: &Coupler<T>,
    position: usize,
    class: &str,
) -> Option<usize> {
    let module = coupler.modules().get(position)?;
    (module.variant.class == class).then_some(position)
}

fn expect_bool(value: ProcessValue) -> Result<bool, FieldbusError> {
    match value {
        ProcessValue::Bool(b) => Ok(b),
        other => Err(FieldbusError::TypeMismatch {
            expected: DataKind::Bool,
            found: other.data_kind(),
        }),
    }
}

fn expect_word(value: ProcessValue) -> Result<i16, FieldbusError> {
    match value {
        ProcessValue::Int16(v) => Ok(v),
        other => Err(FieldbusError::TypeMismatch {
            expected: DataKind::Int16,
            found: other.data_kind(),
        }),
    }
}

/// A digital input module.
#[derive(Debug, Clone, Copy)]
pub struct DigitalInput {
    position: usize,
}

impl DigitalInput {
    pub fn bind<T: RegisterTransport>(coupler: &Coupler<T>, position: usize) -> Option<Self> {
        bind_class(coupler, position, class::DIGITAL_IN).map(|position| Self { position })
    }

    pub fn read<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        channel: usize,
    ) -> Result<bool, FieldbusError> {
        expect_bool(coupler.read_channel(self.position, channel)?)
    }

    pub fn read_all<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
    ) -> Result<Vec<bool>, FieldbusError> {
        coupler
            .read_channels(self.position)?
            .into_iter()
            .map(expect_bool)
            .collect()
    }

    /// Selects the channel's input filter by enum label.
    pub fn set_input_filter<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        channel: u16,
        label: &str,
    ) -> Result<(), FieldbusError> {
        coupler.write_parameter_label(self.position, parameter_id::INPUT_FILTER, channel, label)
    }
}

/// A digital output module.
#[derive(Debug, Clone, Copy)]
pub struct DigitalOutput {
    position: usize,
}

impl DigitalOutput {
    pub fn bind<T: RegisterTransport>(coupler: &Coupler<T>, position: usize) -> Option<Self> {
        bind_class(coupler, position, class::DIGITAL_OUT).map(|position| Self { position })
    }

    pub fn set<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        channel: usize,
        on: bool,
    ) -> Result<(), FieldbusError> {
        coupler.write_channel(self.position, channel, &ProcessValue::Bool(on))
    }

    pub fn set_failsafe_mode<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        channel: u16,
        label: &str,
    ) -> Result<(), FieldbusError> {
        coupler.write_parameter_label(self.position, parameter_id::FAILSAFE_MODE, channel, label)
    }
}

/// An analog input module (16-bit signed samples).
#[derive(Debug, Clone, Copy)]
pub struct AnalogInput {
    position: usize,
}

impl AnalogInput {
    pub fn bind<T: RegisterTransport>(coupler: &Coupler<T>, position: usize) -> Option<Self> {
        bind_class(coupler, position, class::ANALOG_IN).map(|position| Self { position })
    }

    pub fn read<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        channel: usize,
    ) -> Result<i16, FieldbusError> {
        expect_word(coupler.read_channel(self.position, channel)?)
    }

    pub fn set_measurement_range<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        channel: u16,
        label: &str,
    ) -> Result<(), FieldbusError> {
        coupler.write_parameter_label(
            self.position,
            parameter_id::MEASUREMENT_RANGE,
            channel,
            label,
        )
    }
}

/// An analog output module (16-bit signed samples).
#[derive(Debug, Clone, Copy)]
pub struct AnalogOutput {
    position: usize,
}

impl AnalogOutput {
    pub fn bind<T: RegisterTransport>(coupler: &Coupler<T>, position: usize) -> Option<Self> {
        bind_class(coupler, position, class::ANALOG_OUT).map(|position| Self { position })
    }

    pub fn write<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        channel: usize,
        value: i16,
    ) -> Result<(), FieldbusError> {
        coupler.write_channel(self.position, channel, &ProcessValue::Int16(value))
    }

    pub fn set_measurement_range<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        channel: u16,
        label: &str,
    ) -> Result<(), FieldbusError> {
        coupler.write_parameter_label(
            self.position,
            parameter_id::MEASUREMENT_RANGE,
            channel,
            label,
        )
    }
}

/// An IO-Link master module.
#[derive(Debug, Clone, Copy)]
pub struct IoLinkMaster {
    position: usize,
}

impl IoLinkMaster {
    pub fn bind<T: RegisterTransport>(coupler: &Coupler<T>, position: usize) -> Option<Self> {
        bind_class(coupler, position, class::IO_LINK_MASTER).map(|position| Self { position })
    }

    pub fn set_port_mode<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        port: u16,
        label: &str,
    ) -> Result<(), FieldbusError> {
        coupler.write_parameter_label(self.position, parameter_id::PORT_MODE, port, label)
    }

    pub fn read_isdu<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        port: u8,
        index: u16,
        subindex: u8,
        length: u16,
    ) -> Result<Vec<u8>, FieldbusError> {
        coupler.read_device_parameter(self.position, port, index, subindex, length)
    }

    pub fn write_isdu<T: RegisterTransport>(
        &self,
        coupler: &mut Coupler<T>,
        port: u8,
        index: u16,
        subindex: u8,
        data: &[u8],
    ) -> Result<(), FieldbusError> {
        coupler.write_device_parameter(self.position, port, index, subindex, data)
    }
}
