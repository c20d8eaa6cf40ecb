//! Register projector (§4.4): `info registers`, diffed by name against the
//! previous snapshot so changed rows can be highlighted. The instruction
//! pointer is exempt from the change highlight (§3).

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterEntry {
    pub name: String,
    pub hex: String,
    pub decorated: String,
    pub integer: String,
    pub changed: bool,
}

/// The conventional gdb register name for the instruction pointer on the
/// platforms this tool targets.
pub const INSTRUCTION_POINTER: &str = "rip";

/// Parses `name <hex> <decorated>` rows. The "integer form" is derived
/// from the hex column (§3); when the decorated column is itself a signed
/// integer gdb already printed it that way and we keep both.
pub fn parse_registers(text: &str) -> Vec<RegisterEntry> {
    let mut registers = Vec::new();
    for line in text.lines() {
        let mut fields = line.split_whitespace();
        let Some(name) = fields.next() else { continue };
        let Some(hex) = fields.next() else { continue };
        if !hex.starts_with("0x") {
            continue;
        }
        let decorated = fields.collect::<Vec<_>>().join(" ");
        let integer = u64::from_str_radix(hex.trim_start_matches("0x"), 16)
            .map(|v| v.to_string())
            .unwrap_or_default();
        registers.push(RegisterEntry {
            name: name.to_string(),
            hex: hex.to_string(),
            decorated,
            integer,
            changed: false,
        });
    }
    registers
}

/// Diffs `current` against `previous` by register name, marking `changed`
/// on every register (other than the instruction pointer) whose hex form
/// differs.
pub fn diff_registers(previous: &[RegisterEntry], current: &mut [RegisterEntry]) {
    for reg in current.iter_mut() {
        if reg.name == INSTRUCTION_POINTER {
            reg.changed = false;
            continue;
        }
        reg.changed = previous
            .iter()
            .find(|p| p.name == reg.name)
            .map(|p| p.hex != reg.hex)
            .unwrap_or(false);
    }
}
