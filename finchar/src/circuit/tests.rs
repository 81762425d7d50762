use super::*;
use crate::units::SiPrefix;

fn bias_circuit() -> Circuit {
    let mut circuit = Circuit::new("nmos bias");
    circuit
        .include("models/nmos.sp")
        .add(Vsource::dc("d", "drain", GROUND, SiValue::zero()))
        .add(Vsource::dc("g", "gate", GROUND, SiValue::zero()))
        .add(Instance::new(
            "n",
            "nFinFet",
            ["drain", "gate", GROUND, GROUND],
        ));
    circuit
}

#[test]
fn element_names_get_type_letters() {
    let circuit = bias_circuit();
    let names: Vec<&str> = circuit.elements().iter().map(|e| e.name().as_str()).collect();
    assert_eq!(names, vec!["Vd", "Vg", "Xn"]);

    let c = Capacitor::new("Ceq", "out", GROUND, SiValue::zero());
    assert_eq!(c.name.as_str(), "Ceq");
}

#[test]
fn renders_element_cards() {
    let circuit = bias_circuit().with_dc("vg", SiValue::volts(0.75)).unwrap();
    assert_eq!(
        circuit.spice_lines(),
        vec![
            "Vd drain 0 DC 0".to_string(),
            "Vg gate 0 DC 750000u".to_string(),
            "Xn drain gate 0 0 nFinFet".to_string(),
        ]
    );
    assert_eq!(circuit.include_strings(), vec!["models/nmos.sp".to_string()]);
}

#[test]
fn renders_stimuli() {
    let sine = Vsource::sine(
        "ac",
        "gate",
        "1",
        SiValue::volts(0.1),
        Sine {
            offset: SiValue::zero(),
            amplitude: SiValue::volts(0.1),
            freq: SiValue::new(1, SiPrefix::Kilo),
            delay: SiValue::zero(),
            damping: SiValue::zero(),
        },
    );
    assert_eq!(
        Element::from(sine).spice_line(),
        "Vac gate 1 DC 0 AC 100000u SIN(0 100000u 1k 0 0)"
    );

    let pulse = Vsource::pulse(
        "IN",
        "IN",
        GROUND,
        Pulse {
            v1: SiValue::zero(),
            v2: SiValue::new(700, SiPrefix::Milli),
            td: SiValue::new(100, SiPrefix::Pico),
            tr: SiValue::new(1, SiPrefix::Pico),
            tf: SiValue::new(1, SiPrefix::Pico),
            pw: SiValue::new(1, SiPrefix::Nano),
            period: SiValue::new(2, SiPrefix::Nano),
        },
    );
    assert_eq!(
        Element::from(pulse).spice_line(),
        "VIN IN 0 DC 0 PULSE(0 700m 100p 1p 1p 1n 2n)"
    );
}

#[test]
fn with_dc_leaves_original_untouched() {
    let base = bias_circuit();
    let a = base.with_dc("Vd", SiValue::volts(1.2)).unwrap();
    let b = a.with_dc("Vd", SiValue::volts(0.05)).unwrap();

    assert_eq!(base.source("Vd").unwrap().dc, SiValue::zero());
    assert_eq!(a.source("Vd").unwrap().dc, SiValue::volts(1.2));
    assert_eq!(b.source("Vd").unwrap().dc, SiValue::volts(0.05));
}

#[test]
fn missing_source_is_an_error() {
    let err = bias_circuit()
        .with_dc("Vbulk", SiValue::volts(0.0))
        .unwrap_err();
    assert!(matches!(err.source(), ErrorSource::SourceNotFound(name) if name == "Vbulk"));

    // An instance is not a voltage source.
    assert!(bias_circuit().with_dc("Xn", SiValue::zero()).is_err());
}

#[test]
fn with_capacitance_replaces_value() {
    let mut circuit = Circuit::new("load");
    circuit.add(Capacitor::new("eq", "OUT", GROUND, SiValue::zero()));
    let loaded = circuit
        .with_capacitance("Ceq", SiValue::farads(2e-15))
        .unwrap();
    assert_eq!(loaded.spice_lines(), vec!["Ceq OUT 0 2000000000e-24".to_string()]);
}
