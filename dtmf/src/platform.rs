//! Platform glue: the driver match table, the device handle and the collaborator context.

use log::{debug, error};
use mt88l70_gpio::GpioDriver;
use mt88l70_gpio::irq::IrqChip;
use crate::{ConfigError, DtmfResult};
use crate::driver::Mt88l70Dtmf;
use crate::input::InputBackend;
use crate::of::DeviceNode;

/// The chip revisions the driver supports.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum DeviceVariant {
    Mt88l70,
}

impl DeviceVariant {
    /// Number of data lines the receiver presents its code on.
    pub fn data_lines(&self) -> usize {
        match self {
            DeviceVariant::Mt88l70 => 4,
        }
    }

    pub fn irq_name(&self) -> &'static str {
        match self {
            DeviceVariant::Mt88l70 => "mt88l70-dtmf",
        }
    }
}

#[derive(Copy, Clone, Debug)]
pub struct OfDeviceId {
    pub compatible: &'static str,
    pub data: DeviceVariant,
}

pub const OF_MATCH: &[OfDeviceId] = &[
    OfDeviceId {
        compatible: "microsemi,mt88l70",
        data: DeviceVariant::Mt88l70,
    },
];

/// Tells whether a device may wake the host from suspend.
pub trait WakeupSource {
    fn may_wakeup(&self) -> bool;
}

/// A device instance as the lifecycle framework sees it.
#[derive(Clone, Debug)]
pub struct PlatformDevice {
    pub name: String,
    pub node: Option<DeviceNode>,
    wakeup: bool,
}

impl PlatformDevice {
    pub fn new(name: &str, node: Option<DeviceNode>) -> Self {
        PlatformDevice {
            name: name.to_string(),
            node,
            wakeup: false,
        }
    }

    /// Enables or disables wakeup on top of what the hardware description declares.
    pub fn set_wakeup_enable(&mut self, enable: bool) {
        self.wakeup = enable;
    }
}

impl WakeupSource for PlatformDevice {
    fn may_wakeup(&self) -> bool {
        self.wakeup || self.node.as_ref().is_some_and(|node| node.wakeup_source)
    }
}

/// The collaborators a device is attached with.
#[derive(Copy, Clone, Debug)]
pub struct Platform<'a> {
    pub gpio: &'a dyn GpioDriver,
    pub irq: &'a dyn IrqChip,
    pub input: &'a dyn InputBackend,
}

#[derive(Debug)]
pub struct PlatformDriver {
    pub name: &'static str,
    pub of_match_table: &'static [OfDeviceId],
}

pub const MT88L70_DRIVER: PlatformDriver = PlatformDriver {
    name: "mt88l70",
    of_match_table: OF_MATCH,
};

impl PlatformDriver {
    /// Matches a device by compatible string, falling back to the device name.
    pub fn match_device(&self, dev: &PlatformDevice) -> Option<DeviceVariant> {
        if let Some(node) = &dev.node {
            let matched = self
                .of_match_table
                .iter()
                .find(|id| node.is_compatible(id.compatible));
            if let Some(id) = matched {
                return Some(id.data);
            }
        }

        if dev.name == self.name {
            return self.of_match_table.first().map(|id| id.data);
        }

        None
    }

    /// Attaches the driver to a device. Dropping the returned state detaches it.
    pub fn probe(&self, dev: &PlatformDevice, platform: Platform<'_>) -> DtmfResult<Mt88l70Dtmf> {
        let Some(variant) = self.match_device(dev) else {
            error!("{}: device does not match driver {}", dev.name, self.name);
            return Err(ConfigError::NoDevice.into());
        };

        debug!("{}: probing as {:?}", dev.name, variant);
        Mt88l70Dtmf::probe(dev, variant, platform)
    }

    pub fn suspend(&self, dtmf: &Mt88l70Dtmf, dev: &PlatformDevice) -> DtmfResult<()> {
        dtmf.suspend(dev)
    }

    pub fn resume(&self, dtmf: &Mt88l70Dtmf, dev: &PlatformDevice) -> DtmfResult<()> {
        dtmf.resume(dev)
    }
}
