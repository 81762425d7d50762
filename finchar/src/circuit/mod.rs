//! Circuit topology descriptions.
//!
//! A [`Circuit`] is built once per sweep and never mutated afterwards. Each
//! sweep point derives its own copy with the swept values applied, so a
//! request that has been handed to the simulator cannot observe later points.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::deps::arcstr::ArcStr;
use crate::error::{ErrorSource, Result};
use crate::units::SiValue;

pub mod elements;
#[cfg(test)]
mod tests;

pub use elements::*;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Circuit {
    title: ArcStr,
    includes: Vec<PathBuf>,
    elements: Vec<Element>,
}

impl Circuit {
    pub fn new(title: impl Into<ArcStr>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// Includes an externally authored file (device models, subcircuits) verbatim.
    pub fn include(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.includes.push(path.into());
        self
    }

    pub fn add(&mut self, element: impl Into<Element>) -> &mut Self {
        self.elements.push(element.into());
        self
    }

    #[inline]
    pub fn title(&self) -> &ArcStr {
        &self.title
    }

    #[inline]
    pub fn includes(&self) -> &[PathBuf] {
        &self.includes
    }

    #[inline]
    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    /// Looks up an element by its SPICE name. SPICE names are case-insensitive.
    pub fn element(&self, name: &str) -> Option<&Element> {
        self.elements
            .iter()
            .find(|e| e.name().eq_ignore_ascii_case(name))
    }

    fn element_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.elements
            .iter_mut()
            .find(|e| e.name().eq_ignore_ascii_case(name))
    }

    pub fn source(&self, name: &str) -> Option<&Vsource> {
        match self.element(name)? {
            Element::Vsource(v) => Some(v),
            _ => None,
        }
    }

    /// Returns a copy of this circuit with the DC value of voltage source `name`
    /// replaced by `value`.
    pub fn with_dc(&self, name: &str, value: SiValue) -> Result<Self> {
        let mut circuit = self.clone();
        match circuit.element_mut(name) {
            Some(Element::Vsource(v)) => {
                v.dc = value;
                Ok(circuit)
            }
            _ => Err(ErrorSource::SourceNotFound(ArcStr::from(name)).into()),
        }
    }

    /// Returns a copy of this circuit with the value of capacitor `name`
    /// replaced by `value`.
    pub fn with_capacitance(&self, name: &str, value: SiValue) -> Result<Self> {
        let mut circuit = self.clone();
        match circuit.element_mut(name) {
            Some(Element::Capacitor(c)) => {
                c.value = value;
                Ok(circuit)
            }
            _ => Err(ErrorSource::SourceNotFound(ArcStr::from(name)).into()),
        }
    }

    /// The element cards of this circuit, one per line.
    pub fn spice_lines(&self) -> Vec<String> {
        self.elements.iter().map(Element::spice_line).collect()
    }

    /// Include paths rendered as strings, for netlist templates.
    pub fn include_strings(&self) -> Vec<String> {
        self.includes.iter().map(|p| path_string(p)).collect()
    }
}

fn path_string(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
