// Word layout
pub const TYPE_DEFINING_BIT: u32 = 0x8000_0000;
pub const TYPE_TAG_SHIFT: u32 = 27;
pub const TYPE_TAG_MASK: u32 = 0xF;
pub const EVENT_NUMBER_MASK: u32 = 0x3F_FFFF; // 22 bits
pub const TRIGGER_TIME_MASK: u32 = 0xFF_FFFF; // 24 bits
pub const CHANNEL_SHIFT: u32 = 23;
pub const CHANNEL_MASK: u32 = 0xF;
pub const WINDOW_WORD_COUNT_MASK: u32 = 0xFFF;
pub const SAMPLE_A_SHIFT: u32 = 16;
pub const SAMPLE_MASK: u32 = 0x1FFF; // 13 bits
pub const SAMPLE_A_INVALID_BIT: u32 = 0x2000_0000;
pub const SAMPLE_B_INVALID_BIT: u32 = 0x2000;
pub const PULSE_SLOT_SHIFT: u32 = 21;
pub const PULSE_SLOT_MASK: u32 = 0x3;
pub const PULSE_INTEGRAL_MASK: u32 = 0x7_FFFF; // 19 bits
pub const PULSE_TIME_MASK: u32 = 0xFFFF;
pub const NUMBER_OF_TYPE_TAGS: usize = 16;

// Words in front of the FADC payload inside a readout bank
pub const BANK_HEADER_WORDS: usize = 2;

// Hardware
pub const MAX_PULSES: usize = 4; // per channel per event
pub const DEFAULT_NUMBER_OF_CHANNELS: usize = 16;
pub const DEFAULT_CLOCK_MHZ: f64 = 250.0;
// 1000 / 64, the pulse time is reported in 1/64 of a clock period
pub const PULSE_TIME_NS_MHZ: f64 = 15.625;

// Analyzer defaults
pub const DEFAULT_RESOLUTION: usize = 2;
pub const DEFAULT_THRESHOLD: f64 = 10.0;
pub const DEFAULT_PEDESTAL_WINDOW: usize = 5;
pub const DEFAULT_PEDESTAL_FLATNESS: f64 = 1.0;
pub const DEFAULT_OVERFLOW_VALUE: u32 = 4096;

// Analyzer internals
pub const TREND_TOLERANCE: f64 = 0.1; // ADC units
pub const OVERFLOW_PEDESTAL_FRACTION: f64 = 0.95;
pub const PEDESTAL_WINDOW_DIVISOR: usize = 12;
pub const PEAK_SIGNIFICANCE: f64 = 3.0; // in units of pedestal error
pub const BACKGROUND_CLIP_DIVISOR: usize = 4;
pub const BACKGROUND_TRIM_SIGMA: f64 = 1.0;
pub const BACKGROUND_TRIM_ITERATIONS: usize = 3;
