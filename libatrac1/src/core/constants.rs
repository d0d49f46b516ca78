//! Fixed tables and frame geometry shared by the encoder and decoder.

/// Sample rate the format is defined for.
pub const SAMPLE_RATE: u32 = 44100;

/// PCM samples per frame and per channel.
pub const FRAME_SAMPLES: usize = 512;

/// Encoded sound unit size in bytes.
pub const SOUND_UNIT_SIZE: usize = 212;

/// Total bit budget of one sound unit.
pub const FRAME_BITS: usize = SOUND_UNIT_SIZE * 8;

/// Fixed per-frame overhead: 16 header bits plus 24 reserved bits.
pub const FRAME_OVERHEAD_BITS: usize = 40;

/// Per-BFU metadata cost: 4-bit word-length index + 6-bit scale-factor index.
pub const BITS_PER_BFU_METADATA: usize = 10;

/// Number of QMF bands (low, mid, high).
pub const NUM_BANDS: usize = 3;

/// Samples per band per frame.
pub const BAND_SAMPLES: [usize; NUM_BANDS] = [128, 128, 256];

/// Round-trip delay of one QMF analysis/synthesis stage, in samples at that
/// stage's input rate. Also the length of the filter delay lines.
pub const QMF_DELAY: usize = 46;

/// Extra delay applied to the upper branch of the QMF tree, on both the
/// encoder and decoder sides, so that all three band paths line up.
pub const HIGH_BAND_DELAY: usize = 39;

/// Samples carried across frames by each MDCT block seam, at band rate.
pub const MDCT_OVERLAP: usize = 32;

/// End-to-end codec delay in input samples: one QMF stage at full rate, one
/// at half rate, and the MDCT seam at quarter rate.
pub const CODEC_DELAY: usize = QMF_DELAY + 2 * QMF_DELAY + 4 * MDCT_OVERLAP;

/// Maximum number of block floating units per frame.
pub const MAX_BFUS: usize = 52;

/// Selectable active-BFU counts; the wire stores an index into this table.
pub const BFU_AMOUNTS: [usize; 8] = [20, 28, 32, 36, 40, 44, 48, 52];

/// First BFU index of each band (and one-past-the-end of the last).
pub const BFU_BAND_BOUNDARIES: [usize; NUM_BANDS + 1] = [0, 20, 36, 52];

/// Coefficients per BFU. Sums to 512.
pub const BFU_SIZES: [usize; MAX_BFUS] = [
    8, 8, 8, 8, 4, 4, 4, 4, 8, 8, 8, 8, 6, 6, 6, 6, 6, 6, 6, 6, // low
    6, 6, 6, 6, 7, 7, 7, 7, 9, 9, 9, 9, 10, 10, 10, 10, // mid
    12, 12, 12, 12, 12, 12, 12, 12, 20, 20, 20, 20, 20, 20, 20, 20, // high
];

/// BFU start offsets within the 512-coefficient spectrum under long blocks.
pub const BFU_START_LONG: [usize; MAX_BFUS] = [
    0, 8, 16, 24, 32, 36, 40, 44, 48, 56, 64, 72, 80, 86, 92, 98, 104, 110, 116, 122, // low
    128, 134, 140, 146, 152, 159, 166, 173, 180, 189, 198, 207, 216, 226, 236, 246, // mid
    256, 268, 280, 292, 304, 316, 328, 340, 352, 372, 392, 412, 432, 452, 472, 492, // high
];

/// BFU start offsets under short blocks, where each band's spectrum is laid
/// out as consecutive 32-coefficient transform blocks.
pub const BFU_START_SHORT: [usize; MAX_BFUS] = [
    0, 32, 64, 96, 8, 40, 72, 104, 12, 44, 76, 108, 20, 52, 84, 116, 26, 58, 90, 122, // low
    128, 160, 192, 224, 134, 166, 198, 230, 141, 173, 205, 237, 150, 182, 214, 246, // mid
    256, 288, 320, 352, 384, 416, 448, 480, 268, 300, 332, 364, 396, 428, 460, 492, // high
];

/// Bits per quantized coefficient for each word-length index. Index 0 means
/// the BFU carries no coefficient data at all.
pub const WORD_LENGTH_BITS: [u32; 16] = [0, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15, 16];

/// Scale-factor table size; entries are `2^(i/3 - 21)`.
pub const NUM_SCALE_FACTORS: usize = 64;

/// Half of the symmetric 48-tap QMF prototype filter. The full window is
/// `win[i] = win[47 - i] = 2 * QMF_TAP_HALF[i]`.
pub const QMF_TAP_HALF: [f64; 24] = [
    -0.000014619070,
    -0.000092054790,
    -0.000056157569,
    0.000301172690,
    0.000242251900,
    -0.000852938970,
    -0.000520557400,
    0.002034016900,
    0.000783338910,
    -0.004215386200,
    -0.000756149880,
    0.007840294400,
    -0.000061169922,
    -0.013441620000,
    0.002462682100,
    0.021736089000,
    -0.007801671000,
    -0.034090221000,
    0.018809490000,
    0.054326009000,
    -0.043596379000,
    -0.099384367000,
    0.132079090000,
    0.464241590000,
];

/// Number of critical bands (Bark scale, 0-24 Bark for audio up to ~20kHz)
pub const NUM_BARK_BANDS: usize = 25;

/// Critical band edges in Hz (Bark scale)
pub const BARK_BAND_EDGES: [f32; 26] = [
    0.0, 100.0, 200.0, 300.0, 400.0, 510.0, 630.0, 770.0, 920.0, 1080.0, 1270.0, 1480.0, 1720.0,
    2000.0, 2320.0, 2700.0, 3150.0, 3700.0, 4400.0, 5300.0, 6400.0, 7700.0, 9500.0, 12000.0,
    15500.0, 20500.0,
];

/// Band index (0 = low, 1 = mid, 2 = high) of a BFU.
pub fn bfu_band(bfu: usize) -> usize {
    if bfu < BFU_BAND_BOUNDARIES[1] {
        0
    } else if bfu < BFU_BAND_BOUNDARIES[2] {
        1
    } else {
        2
    }
}
