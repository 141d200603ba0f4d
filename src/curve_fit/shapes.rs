mod gaussian;
mod lorentzian;

pub use gaussian::GaussianPeakShape;
pub use lorentzian::LorentzianPeakShape;
