//! Canonical signal names.
//!
//! Engines disagree on how they name saved vectors (`v(gate)` vs. `V(GATE)`,
//! `vd#branch` vs. `I(VD)`). Simulator plugins rewrite every name through
//! [`canonical`] so that measurements can look signals up with [`voltage`]
//! and [`current`] regardless of the engine that produced them.

/// The name under which a DC analysis reports its swept variable.
pub const SWEEP: &str = "sweep";

/// The canonical name of the voltage at `node`.
pub fn voltage(node: &str) -> String {
    format!("v({})", node.to_lowercase())
}

/// The canonical name of the branch current through voltage source `source`.
///
/// SPICE reports the current flowing into the positive terminal.
pub fn current(source: &str) -> String {
    format!("i({})", source.to_lowercase())
}

/// Rewrites an engine-specific vector name into its canonical form.
pub fn canonical(raw: &str) -> String {
    let name = raw.trim().to_lowercase();

    if let Some(source) = name.strip_suffix("#branch") {
        return current(source);
    }

    match name.as_str() {
        "time" | "frequency" => return name,
        "sweep" | "v-sweep" | "i-sweep" | "temp-sweep" | "res-sweep" => {
            return SWEEP.to_string()
        }
        _ => (),
    }

    if let Some(inner) = name
        .strip_prefix("i(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        return current(inner.strip_suffix("#branch").unwrap_or(inner));
    }

    if name.starts_with("v(") && name.ends_with(')') {
        return name;
    }

    if name.contains('(') {
        // Device-level quantities such as `@m1[id]` or `ix(x1:d)` keep their shape.
        return name;
    }

    voltage(&name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ngspice_names() {
        assert_eq!(canonical("v(gate)"), "v(gate)");
        assert_eq!(canonical("vd#branch"), "i(vd)");
        assert_eq!(canonical("i(vac)"), "i(vac)");
        assert_eq!(canonical("gate"), "v(gate)");
        assert_eq!(canonical("v-sweep"), SWEEP);
        assert_eq!(canonical("time"), "time");
        assert_eq!(canonical("frequency"), "frequency");
    }

    #[test]
    fn xyce_names() {
        assert_eq!(canonical("V(OUT)"), "v(out)");
        assert_eq!(canonical("I(VD)"), "i(vd)");
        assert_eq!(canonical("TIME"), "time");
        assert_eq!(canonical("FREQUENCY"), "frequency");
        assert_eq!(canonical("sweep"), SWEEP);
    }

    #[test]
    fn hierarchical_nodes_keep_their_path() {
        assert_eq!(canonical("v(xinv1.n1)"), "v(xinv1.n1)");
        assert_eq!(canonical("XINV1:N1"), "v(xinv1:n1)");
    }

    #[test]
    fn lookup_helpers_match_canonical_names() {
        assert_eq!(voltage("OUT"), canonical("V(OUT)"));
        assert_eq!(current("Vac"), canonical("vac#branch"));
    }
}
