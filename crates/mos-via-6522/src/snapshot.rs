/// Complete VIA state, including pin levels driven from outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ViaSnapshot {
    pub ora: u8,
    pub orb: u8,
    pub ddra: u8,
    pub ddrb: u8,
    pub input_a: u8,
    pub input_b: u8,
    pub latch_a: u8,
    pub latch_b: u8,
    pub t1_counter: u16,
    pub t1_latch: u16,
    pub t1_armed: bool,
    pub pb7: bool,
    pub t2_counter: u16,
    pub t2_latch_lo: u8,
    pub t2_armed: bool,
    pub sr: u8,
    pub acr: u8,
    pub pcr: u8,
    pub ifr: u8,
    pub ier: u8,
    pub ca1: bool,
    pub ca2: bool,
    pub cb1: bool,
    pub cb2: bool,
}

#[cfg(all(test, feature = "serde"))]
mod tests {
    use crate::{Register, Via6522};

    #[test]
    fn json_round_trip() {
        let mut via = Via6522::new();
        via.write(Register::T1cl, 0x34);
        via.write(Register::T1ch, 0x12);
        let snap = via.snapshot();
        let json = serde_json::to_string(&snap).unwrap();
        assert!(json.contains("\"t1_counter\":4660"));
        assert_eq!(serde_json::from_str::<super::ViaSnapshot>(&json).unwrap(), snap);
    }
}
