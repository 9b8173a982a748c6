use crate::{common::*, trainer::EpochLoss};
use plotters::prelude::{
    BitMapBackend, ChartBuilder, Color as _, IntoDrawingArea as _, LineSeries, PathElement,
    SeriesLabelPosition, BLACK, BLUE, RED, WHITE,
};

/// Draws the train and validation loss curves into a PNG file.
pub fn plot_loss_curve<P>(path: P, curve: &[EpochLoss]) -> Result<()>
where
    P: AsRef<Path>,
{
    ensure!(!curve.is_empty(), "the loss curve is empty");

    let finite_losses = curve
        .iter()
        .flat_map(|record| [record.train_loss, record.val_loss])
        .filter(|loss| loss.is_finite());
    let (min_loss, max_loss) = finite_losses
        .minmax()
        .into_option()
        .ok_or_else(|| format_err!("the loss curve has no finite value"))?;
    let margin = ((max_loss - min_loss) * 0.1).max(1e-3);
    let last_epoch = curve.iter().map(|record| record.epoch).max().unwrap_or(1).max(2);

    let root = BitMapBackend::new(path.as_ref(), (800, 600)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Training and validation loss", ("sans-serif", 28))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(1..last_epoch, (min_loss - margin)..(max_loss + margin))?;

    chart
        .configure_mesh()
        .x_desc("Epoch")
        .y_desc("Loss")
        .y_label_formatter(&|y| format!("{:.4}", y))
        .draw()?;

    chart
        .draw_series(LineSeries::new(
            curve
                .iter()
                .filter(|record| record.train_loss.is_finite())
                .map(|record| (record.epoch, record.train_loss)),
            &BLUE,
        ))?
        .label("train")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &BLUE));

    chart
        .draw_series(LineSeries::new(
            curve
                .iter()
                .filter(|record| record.val_loss.is_finite())
                .map(|record| (record.epoch, record.val_loss)),
            &RED,
        ))?
        .label("validation")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], &RED));

    chart
        .configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}
