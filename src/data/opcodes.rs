use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref OPCODE_NAME_MAP: HashMap<u8, &'static str> = {
        let mut m = HashMap::new();

        // Non-control frames
        m.insert(0x0, "CONTINUATION");
        m.insert(0x1, "TEXT");
        m.insert(0x2, "BINARY");

        // Control frames
        m.insert(0x8, "CLOSE");
        m.insert(0x9, "PING");
        m.insert(0xA, "PONG");

        m
    };
}

pub fn get_opcode_name(opcode: u8) -> Option<&'static str> {
    OPCODE_NAME_MAP.get(&opcode).copied()
}

pub fn is_control_opcode(opcode: u8) -> bool {
    opcode & 0x8 != 0
}
