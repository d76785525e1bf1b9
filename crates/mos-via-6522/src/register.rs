/// The sixteen register selects, decoded from the low four address bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    /// Port B data (handshake on access).
    Orb,
    /// Port A data (handshake on access).
    Ora,
    Ddrb,
    Ddra,
    /// Timer 1 counter low. Write goes to the latch; read clears the T1 flag.
    T1cl,
    /// Timer 1 counter high. Write loads the counter and arms the timer.
    T1ch,
    T1ll,
    T1lh,
    /// Timer 2 counter low. Write goes to the latch; read clears the T2 flag.
    T2cl,
    /// Timer 2 counter high. Write loads the counter and arms the timer.
    T2ch,
    Sr,
    Acr,
    Pcr,
    Ifr,
    Ier,
    /// Port A data without handshake.
    OraNoHandshake,
}

impl Register {
    const ALL: [Self; 16] = [
        Self::Orb,
        Self::Ora,
        Self::Ddrb,
        Self::Ddra,
        Self::T1cl,
        Self::T1ch,
        Self::T1ll,
        Self::T1lh,
        Self::T2cl,
        Self::T2ch,
        Self::Sr,
        Self::Acr,
        Self::Pcr,
        Self::Ifr,
        Self::Ier,
        Self::OraNoHandshake,
    ];

    /// Decode a window index. Only RS0-RS3 are wired, so higher bits mirror.
    #[must_use]
    pub const fn from_index(index: u8) -> Self {
        Self::ALL[(index & 0x0F) as usize]
    }
}

/// Interrupt flag and enable bits (IFR/IER).
pub mod irq {
    pub const CA2: u8 = 0x01;
    pub const CA1: u8 = 0x02;
    pub const SR: u8 = 0x04;
    pub const CB2: u8 = 0x08;
    pub const CB1: u8 = 0x10;
    pub const T2: u8 = 0x20;
    pub const T1: u8 = 0x40;
    /// IFR: any enabled flag is set. IER writes: 1 = set, 0 = clear.
    pub const ANY: u8 = 0x80;
}
