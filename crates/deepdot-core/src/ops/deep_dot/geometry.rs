//! Index arithmetic shared by the forward and backward passes.

/// Relative neighborhood window for a square kernel of side `kernel_size`.
///
/// `start` comes from truncating integer division, so odd kernel sizes get
/// a symmetric window while even sizes get a top-left-biased one: K = 3
/// covers offsets {-1, 0, 1} but K = 4 covers {-2, -1, 0, 1}. The even
/// case is the historical convention of the operation and is kept as is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowGeometry {
    kernel_size: usize,
    start: isize,
    end: isize,
    offset: isize,
}

impl WindowGeometry {
    pub fn new(kernel_size: usize) -> Self {
        let k = kernel_size as isize;
        let start = -k / 2;
        let end = k + start;
        let offset = -(k + 1) * start;
        Self {
            kernel_size,
            start,
            end,
            offset,
        }
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// First relative offset of the window (inclusive).
    pub fn start(&self) -> isize {
        self.start
    }

    /// One past the last relative offset of the window (exclusive).
    pub fn end(&self) -> isize {
        self.end
    }

    /// Number of taps in the window, `kernel_size²`.
    pub fn taps(&self) -> usize {
        self.kernel_size * self.kernel_size
    }

    /// Flattened kernel-depth index for the relative offset `(i, j)`.
    ///
    /// Bijects `[start, end) × [start, end)` onto `[0, kernel_size²)` in
    /// row-major order.
    pub fn depth(&self, i: isize, j: isize) -> usize {
        debug_assert!(i >= self.start && i < self.end);
        debug_assert!(j >= self.start && j < self.end);
        (self.kernel_size as isize * i + j + self.offset) as usize
    }
}

/// Scale-ratio mapping from signal coordinates to kernel coordinates.
///
/// When the kernel tensor is a coarser (or finer) control grid than the
/// signal, each signal row `h` reads the kernel row `floor(h * Hk / H)`,
/// and columns likewise. Equal extents map through unchanged.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResolutionMap {
    ratio_h: f64,
    ratio_w: f64,
}

impl ResolutionMap {
    /// Build the mapping from signal extents `(H, W)` to kernel extents
    /// `(Hk, Wk)`.
    pub fn new(signal: (usize, usize), kernel: (usize, usize)) -> Self {
        let ratio_h = if kernel.0 == signal.0 {
            1.0
        } else {
            kernel.0 as f64 / signal.0 as f64
        };
        let ratio_w = if kernel.1 == signal.1 {
            1.0
        } else {
            kernel.1 as f64 / signal.1 as f64
        };
        Self { ratio_h, ratio_w }
    }

    pub fn is_identity(&self) -> bool {
        self.ratio_h == 1.0 && self.ratio_w == 1.0
    }

    pub fn row(&self, h: usize) -> usize {
        (h as f64 * self.ratio_h) as usize
    }

    pub fn col(&self, w: usize) -> usize {
        (w as f64 * self.ratio_w) as usize
    }
}
