use std::fmt::{Debug, Formatter};
use log::{debug, error, trace, warn};
use mt88l70_gpio::irq::{IrqHandler, IrqRegistration, IrqReturn, IrqTrigger};
use mt88l70_gpio::{GpioActiveLevel, GpioError, GpioInput};
use crate::decode::{DataBus, DataLine};
use crate::input::{
    BUS_HOST, EventType, InputDevice, InputEvent, InputId, InputRegistration, InputReporter,
    MSC_SCAN,
};
use crate::keymap::{parse_matrix_geometry, Keymap};
use crate::of::{GpioSpec, PROP_DATA_GPIOS, PROP_KEYMAP, PROP_STROBE_GPIOS};
use crate::platform::{DeviceVariant, Platform, PlatformDevice, WakeupSource};
use crate::{ConfigError, DtmfResult, ResourceError};

/// An attached MT88L70 receiver.
///
/// Owns every resource acquired while attaching. Dropping it detaches the device, releasing the
/// input registration, the interrupt and the input device, in that order.
///
/// The strobe and data lines are owned by the interrupt handler, so they are freed together with
/// the interrupt rather than after the input device. No line is released while the handler can
/// still sample it, and nothing that handler reports to is released before it.
pub struct Mt88l70Dtmf {
    registration: Box<dyn InputRegistration>,
    irq: Box<dyn IrqRegistration>,
    input: Box<dyn InputDevice>,
    keymap: Keymap,
    variant: DeviceVariant,
    name: String,
}

/// Resolves the `index`-th line of a named gpio property to an input.
fn request_input(
    platform: Platform<'_>,
    property: &'static str,
    index: usize,
    spec: GpioSpec,
) -> Result<Box<dyn GpioInput>, GpioError> {
    let pin = platform.gpio.get_pin(spec.line as usize)?;
    trace!("Acquired {:?} for {}[{}]", pin, property, index);
    pin.into_input()
}

impl Mt88l70Dtmf {
    pub(crate) fn probe(
        dev: &PlatformDevice,
        variant: DeviceVariant,
        platform: Platform<'_>,
    ) -> DtmfResult<Self> {
        let Some(node) = dev.node.as_ref() else {
            error!("{}: no device description", dev.name);
            return Err(ConfigError::NoDevice.into());
        };

        let data_count = node.named_gpio_count(PROP_DATA_GPIOS);
        if data_count != variant.data_lines() {
            error!(
                "{}: property {} must contain {} gpios",
                dev.name, PROP_DATA_GPIOS, variant.data_lines(),
            );
            return Err(ConfigError::GpioCount {
                property: PROP_DATA_GPIOS,
                expected: variant.data_lines(),
                found: data_count,
            }
            .into());
        }

        let entries = match node.keymap.as_deref() {
            Some([]) => {
                error!("{}: property {} is empty", dev.name, PROP_KEYMAP);
                return Err(ConfigError::EmptyProperty(PROP_KEYMAP).into());
            }
            Some(entries) => entries,
            None => {
                error!("{}: property {} not found", dev.name, PROP_KEYMAP);
                return Err(ConfigError::MissingProperty(PROP_KEYMAP).into());
            }
        };

        let strobe_spec = node.named_gpio(PROP_STROBE_GPIOS, 0);
        let strobe = strobe_spec
            .ok_or(GpioError::InvalidArgument)
            .and_then(|spec| request_input(platform, PROP_STROBE_GPIOS, 0, spec))
            .map_err(|e| {
                error!("{}: invalid std gpio, error {}", dev.name, e);
                ResourceError::Gpio {
                    what: "std gpio".to_string(),
                    source: e,
                }
            })?;
        let strobe_level = strobe_spec
            .map(|spec| GpioActiveLevel::from_active_low(spec.active_low))
            .unwrap_or_default();
        let trigger = IrqTrigger::for_active_level(strobe_level);

        let mut lines: [Option<DataLine>; 4] = Default::default();
        for (i, slot) in lines.iter_mut().enumerate() {
            let Some(spec) = node.named_gpio(PROP_DATA_GPIOS, i) else {
                warn!("{}: invalid Q{} gpio, no specifier", dev.name, i);
                continue;
            };

            let pin = match platform.gpio.get_pin(spec.line as usize) {
                Ok(pin) => pin,
                Err(e) => {
                    warn!("{}: invalid Q{} gpio, error {}", dev.name, i, e);
                    continue;
                }
            };
            debug!("{}: Q{} on line {}", dev.name, i, pin.index());

            let input = pin.into_input().map_err(|e| {
                error!("{}: failed to set input direction for Q{} gpio, error {}", dev.name, i, e);
                ResourceError::Gpio {
                    what: format!("Q{} gpio", i),
                    source: e,
                }
            })?;
            *slot = Some(DataLine::new(input, GpioActiveLevel::from_active_low(spec.active_low)));
        }
        let bus = DataBus::new(lines);
        debug!("{}: {} of 4 data lines available", dev.name, bus.available());

        let mut input = platform.input.allocate().inspect_err(|e| {
            error!("{}: failed to allocate input device: {}", dev.name, e);
        })?;
        input.set_name(&dev.name);
        input.set_id(InputId {
            bustype: BUS_HOST,
            ..Default::default()
        });

        let geometry = parse_matrix_geometry(node)?;
        let keymap = Keymap::build(entries, geometry).inspect_err(|_| {
            error!("{}: failed to build keymap", dev.name);
        })?;
        input.set_keymap(&keymap);
        input.set_capability(EventType::Msc, MSC_SCAN);

        let handler = DtmfIrq {
            bus,
            keymap,
            reporter: input.reporter()?,
        };
        let irq_name = variant.irq_name();
        let irq = platform
            .irq
            .request_irq(strobe, trigger, irq_name, Box::new(handler))
            .map_err(|e| {
                error!("{}: could not allocate irq {}, error {}", dev.name, irq_name, e);
                ResourceError::Irq {
                    name: irq_name,
                    source: e,
                }
            })?;
        debug!("{}: {:?} registered on {:?}", dev.name, irq, trigger);

        let registration = input.register().inspect_err(|e| {
            error!("{}: could not register input device: {}", dev.name, e);
        })?;

        debug!("{}: attached", dev.name);

        Ok(Mt88l70Dtmf {
            registration,
            irq,
            input,
            keymap,
            variant,
            name: dev.name.clone(),
        })
    }

    pub fn keymap(&self) -> &Keymap {
        &self.keymap
    }

    pub fn variant(&self) -> DeviceVariant {
        self.variant
    }

    /// Gets the edge the strobe interrupt fires on.
    pub fn trigger(&self) -> IrqTrigger {
        self.irq.trigger()
    }

    /// Stops decoding. A wake-capable device keeps the strobe armed as a wake source.
    pub fn suspend(&self, pm: &dyn WakeupSource) -> DtmfResult<()> {
        self.irq.disable().map_err(|e| self.irq_error(e))?;

        if pm.may_wakeup() {
            self.irq.enable_wake().map_err(|e| self.irq_error(e))?;
        }

        debug!("{}: suspended", self.name);
        Ok(())
    }

    /// Undoes [Self::suspend].
    pub fn resume(&self, pm: &dyn WakeupSource) -> DtmfResult<()> {
        if pm.may_wakeup() {
            self.irq.disable_wake().map_err(|e| self.irq_error(e))?;
        }

        self.irq.enable().map_err(|e| self.irq_error(e))?;

        debug!("{}: resumed", self.name);
        Ok(())
    }

    fn irq_error(&self, source: GpioError) -> ResourceError {
        error!("{}: irq {} failed: {}", self.name, self.variant.irq_name(), source);
        ResourceError::Irq {
            name: self.variant.irq_name(),
            source,
        }
    }
}

impl Debug for Mt88l70Dtmf {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Mt88l70Dtmf({}, {:?}, {:?}, {:?})",
            self.name, self.irq, self.input, self.registration,
        )
    }
}

impl Drop for Mt88l70Dtmf {
    fn drop(&mut self) {
        debug!("{}: detaching", self.name);
    }
}

/// The strobe handler. Reports every strobe as a tap of the key the sampled code maps to.
struct DtmfIrq {
    bus: DataBus,
    keymap: Keymap,
    reporter: Box<dyn InputReporter>,
}

impl IrqHandler for DtmfIrq {
    fn handle(&mut self) -> IrqReturn {
        let code = self.bus.sample();
        let key = self.keymap.lookup(code);
        trace!("Decoded {:?} as {:?}", code, key);

        self.reporter.event(InputEvent::scan(code.value()));
        self.reporter.report_key(key, true);
        self.reporter.report_key(key, false);
        self.reporter.sync();

        IrqReturn::Handled
    }
}
