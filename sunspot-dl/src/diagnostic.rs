//! Rendering of diagnostic figures for visual inspection.

use crate::common::*;
use plotters::prelude::{
    BitMapBackend, ChartBuilder, Color as _, IntoDrawingArea as _, Rectangle, BLUE, WHITE,
};

const HISTOGRAM_BINS: usize = 20;

/// Receives figures produced during evaluation and inference.
///
/// Images are `[3, H, W]` float tensors and masks or probability maps are
/// `[1, H, W]` float tensors, all in `[0, 1]`.
pub trait DiagnosticSink
where
    Self: Debug,
{
    fn render_sample(
        &mut self,
        index: usize,
        image: &Tensor,
        target: &Tensor,
        prediction: &Tensor,
    ) -> Result<()>;

    fn render_detection(
        &mut self,
        name: &str,
        image: &Tensor,
        prediction: &Tensor,
        probabilities: &Tensor,
    ) -> Result<()>;
}

/// Discards every figure.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl DiagnosticSink for NullSink {
    fn render_sample(&mut self, _: usize, _: &Tensor, _: &Tensor, _: &Tensor) -> Result<()> {
        Ok(())
    }

    fn render_detection(&mut self, _: &str, _: &Tensor, _: &Tensor, _: &Tensor) -> Result<()> {
        Ok(())
    }
}

/// Writes figures as PNG files into a directory.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new<P>(dir: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
        Ok(Self {
            dir: dir.to_owned(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DiagnosticSink for DirectorySink {
    fn render_sample(
        &mut self,
        index: usize,
        image: &Tensor,
        target: &Tensor,
        prediction: &Tensor,
    ) -> Result<()> {
        let path = self.dir.join(format!("sample_{}.png", index));
        write_montage(&path, &[image, target, prediction])?;
        debug!("save diagnostic figure {}", path.display());
        Ok(())
    }

    fn render_detection(
        &mut self,
        name: &str,
        image: &Tensor,
        prediction: &Tensor,
        probabilities: &Tensor,
    ) -> Result<()> {
        let montage_path = self.dir.join(format!("{}_detection.png", name));
        write_montage(&montage_path, &[image, prediction])?;

        let histogram_path = self.dir.join(format!("{}_histogram.png", name));
        let values: Vec<f32> = Vec::from(
            &probabilities
                .to_device(Device::Cpu)
                .f_to_kind(Kind::Float)?
                .flatten(0, -1),
        );
        plot_histogram(&histogram_path, &values)?;

        debug!(
            "save diagnostic figures {} and {}",
            montage_path.display(),
            histogram_path.display()
        );
        Ok(())
    }
}

/// Places images side by side and writes the result as a PNG file.
///
/// Single-channel panels are drawn in grayscale.
pub fn write_montage<P>(path: P, panels: &[&Tensor]) -> Result<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    ensure!(!panels.is_empty(), "no panel to draw");

    let panels: Vec<_> = panels
        .iter()
        .map(|panel| -> Result<_> {
            let panel = panel.to_device(Device::Cpu).f_to_kind(Kind::Float)?;
            let (channels, _, _) = panel.size3()?;
            let panel = match channels {
                1 => panel.f_repeat(&[3, 1, 1])?,
                3 => panel,
                _ => bail!("unsupported number of channels {}", channels),
            };
            Ok(panel)
        })
        .try_collect()?;
    let montage = Tensor::f_cat(&panels, 2)?;

    let rgb = montage.f_to_mat()?;
    let mut bgr = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;

    let path_str = path
        .to_str()
        .ok_or_else(|| format_err!("non-UTF-8 path {}", path.display()))?;
    let ok = imgcodecs::imwrite(path_str, &bgr, &cv_core::Vector::new())?;
    ensure!(ok, "failed to write {}", path.display());
    Ok(())
}

/// Draws the distribution of values in `[0, 1]`.
pub fn plot_histogram<P>(path: P, values: &[f32]) -> Result<()>
where
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let bin_width = 1.0 / HISTOGRAM_BINS as f64;
    let mut bins = vec![0usize; HISTOGRAM_BINS];
    values.iter().for_each(|&value| {
        let index = ((value as f64 / bin_width) as usize).min(HISTOGRAM_BINS - 1);
        bins[index] += 1;
    });
    let max_count = bins.iter().copied().max().unwrap_or(0).max(1) as f64;

    let root = BitMapBackend::new(path, (640, 480)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Predicted probabilities", ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(55)
        .build_cartesian_2d(0.0..1.0, 0.0..max_count * 1.1)?;

    chart
        .configure_mesh()
        .x_desc("Probability")
        .y_desc("Pixels")
        .y_label_formatter(&|y| format!("{:.0}", y))
        .draw()?;

    chart.draw_series(bins.iter().enumerate().map(|(index, &count)| {
        let x0 = index as f64 * bin_width;
        let x1 = x0 + bin_width;
        Rectangle::new([(x0, 0.0), (x1, count as f64)], BLUE.mix(0.5).filled())
    }))?;

    root.present()?;
    Ok(())
}
