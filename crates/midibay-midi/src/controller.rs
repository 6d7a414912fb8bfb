//! Control change names for the monitor.

/// Name of a controller number, or `CC n` for unassigned ones.
pub fn controller_name(control: u8) -> String {
    let name = match control {
        0 => "Bank Select",
        1 => "Modulation",
        2 => "Breath",
        4 => "Foot Pedal",
        5 => "Portamento Time",
        6 => "Data Entry",
        7 => "Volume",
        8 => "Balance",
        10 => "Pan",
        11 => "Expression",
        32 => "Bank Select LSB",
        64 => "Sustain",
        65 => "Portamento",
        66 => "Sostenuto",
        67 => "Soft Pedal",
        71 => "Resonance",
        72 => "Release Time",
        73 => "Attack Time",
        74 => "Cutoff",
        84 => "Portamento Control",
        91 => "Reverb",
        93 => "Chorus",
        96 => "Data Increment",
        97 => "Data Decrement",
        98 => "NRPN LSB",
        99 => "NRPN MSB",
        100 => "RPN LSB",
        101 => "RPN MSB",
        120 => "All Sound Off",
        121 => "Reset All Controllers",
        122 => "Local Control",
        123 => "All Notes Off",
        124 => "Omni Off",
        125 => "Omni On",
        126 => "Mono On",
        127 => "Poly On",
        _ => return format!("CC {}", control),
    };
    name.to_string()
}
