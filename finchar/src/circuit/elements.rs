//! Primitive netlist elements.

use serde::{Deserialize, Serialize};

use crate::deps::arcstr::ArcStr;
use crate::units::SiValue;

/// The ground node.
pub const GROUND: &str = "0";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Element {
    Vsource(Vsource),
    Capacitor(Capacitor),
    Resistor(Resistor),
    Instance(Instance),
}

impl Element {
    /// The full SPICE name of the element, including its type letter.
    pub fn name(&self) -> &ArcStr {
        match self {
            Self::Vsource(v) => &v.name,
            Self::Capacitor(c) => &c.name,
            Self::Resistor(r) => &r.name,
            Self::Instance(x) => &x.name,
        }
    }

    pub fn spice_line(&self) -> String {
        match self {
            Self::Vsource(v) => v.spice_line(),
            Self::Capacitor(c) => format!("{} {} {} {}", c.name, c.p, c.n, c.value),
            Self::Resistor(r) => format!("{} {} {} {}", r.name, r.p, r.n, r.value),
            Self::Instance(x) => {
                let mut line = x.name.to_string();
                for port in x.ports.iter() {
                    line.push(' ');
                    line.push_str(port);
                }
                line.push(' ');
                line.push_str(&x.subckt);
                line
            }
        }
    }
}

fn prefixed(letter: char, name: &str) -> ArcStr {
    if name
        .chars()
        .next()
        .map(|c| c.eq_ignore_ascii_case(&letter))
        .unwrap_or(false)
    {
        ArcStr::from(name)
    } else {
        arcstr::format!("{letter}{name}")
    }
}

/// An independent voltage source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vsource {
    pub name: ArcStr,
    pub p: ArcStr,
    pub n: ArcStr,
    /// DC value (volts).
    pub dc: SiValue,
    /// AC small-signal magnitude (volts), if the source drives an AC analysis.
    pub ac: Option<SiValue>,
    /// Time-domain stimulus.
    pub waveform: Option<SourceWaveform>,
}

impl Vsource {
    /// A DC source. The `V` prefix is added to `name` when missing.
    pub fn dc(
        name: impl AsRef<str>,
        p: impl Into<ArcStr>,
        n: impl Into<ArcStr>,
        value: SiValue,
    ) -> Self {
        Self {
            name: prefixed('V', name.as_ref()),
            p: p.into(),
            n: n.into(),
            dc: value,
            ac: None,
            waveform: None,
        }
    }

    /// A sinusoidal source with an AC small-signal magnitude and zero DC value.
    pub fn sine(
        name: impl AsRef<str>,
        p: impl Into<ArcStr>,
        n: impl Into<ArcStr>,
        ac_magnitude: SiValue,
        sine: Sine,
    ) -> Self {
        Self {
            ac: Some(ac_magnitude),
            waveform: Some(SourceWaveform::Sine(sine)),
            ..Self::dc(name, p, n, SiValue::zero())
        }
    }

    pub fn pulse(
        name: impl AsRef<str>,
        p: impl Into<ArcStr>,
        n: impl Into<ArcStr>,
        pulse: Pulse,
    ) -> Self {
        Self {
            waveform: Some(SourceWaveform::Pulse(pulse)),
            ..Self::dc(name, p, n, SiValue::zero())
        }
    }

    fn spice_line(&self) -> String {
        let mut line = format!("{} {} {} DC {}", self.name, self.p, self.n, self.dc);
        if let Some(ac) = self.ac {
            line.push_str(&format!(" AC {ac}"));
        }
        match &self.waveform {
            Some(SourceWaveform::Sine(s)) => line.push_str(&format!(
                " SIN({} {} {} {} {})",
                s.offset, s.amplitude, s.freq, s.delay, s.damping
            )),
            Some(SourceWaveform::Pulse(p)) => line.push_str(&format!(
                " PULSE({} {} {} {} {} {} {})",
                p.v1, p.v2, p.td, p.tr, p.tf, p.pw, p.period
            )),
            None => (),
        }
        line
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceWaveform {
    Sine(Sine),
    Pulse(Pulse),
}

/// A sinusoidal stimulus.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sine {
    /// Offset (volts).
    pub offset: SiValue,
    /// Amplitude (volts).
    pub amplitude: SiValue,
    /// Frequency (hertz).
    pub freq: SiValue,
    /// Delay (seconds).
    pub delay: SiValue,
    /// Damping factor (1/seconds).
    pub damping: SiValue,
}

/// A pulse stimulus.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pulse {
    /// Initial value (volts).
    pub v1: SiValue,
    /// Pulsed value (volts).
    pub v2: SiValue,
    /// Delay time (seconds).
    pub td: SiValue,
    /// Rise time (seconds).
    pub tr: SiValue,
    /// Fall time (seconds).
    pub tf: SiValue,
    /// Pulse width (seconds).
    pub pw: SiValue,
    /// Period (seconds).
    pub period: SiValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capacitor {
    pub name: ArcStr,
    pub p: ArcStr,
    pub n: ArcStr,
    /// Capacitance (farads).
    pub value: SiValue,
}

impl Capacitor {
    pub fn new(
        name: impl AsRef<str>,
        p: impl Into<ArcStr>,
        n: impl Into<ArcStr>,
        value: SiValue,
    ) -> Self {
        Self {
            name: prefixed('C', name.as_ref()),
            p: p.into(),
            n: n.into(),
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resistor {
    pub name: ArcStr,
    pub p: ArcStr,
    pub n: ArcStr,
    /// Resistance (ohms).
    pub value: SiValue,
}

impl Resistor {
    pub fn new(
        name: impl AsRef<str>,
        p: impl Into<ArcStr>,
        n: impl Into<ArcStr>,
        value: SiValue,
    ) -> Self {
        Self {
            name: prefixed('R', name.as_ref()),
            p: p.into(),
            n: n.into(),
            value,
        }
    }
}

/// An instance of a subcircuit defined in an included file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instance {
    pub name: ArcStr,
    pub subckt: ArcStr,
    /// Connections, in the subcircuit's port order.
    pub ports: Vec<ArcStr>,
}

impl Instance {
    pub fn new<I, P>(name: impl AsRef<str>, subckt: impl Into<ArcStr>, ports: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<ArcStr>,
    {
        Self {
            name: prefixed('X', name.as_ref()),
            subckt: subckt.into(),
            ports: ports.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<Vsource> for Element {
    fn from(value: Vsource) -> Self {
        Self::Vsource(value)
    }
}

impl From<Capacitor> for Element {
    fn from(value: Capacitor) -> Self {
        Self::Capacitor(value)
    }
}

impl From<Resistor> for Element {
    fn from(value: Resistor) -> Self {
        Self::Resistor(value)
    }
}

impl From<Instance> for Element {
    fn from(value: Instance) -> Self {
        Self::Instance(value)
    }
}
