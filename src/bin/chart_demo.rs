use kpidash::charts;
use kpidash::table::{Table, Value};

/// Renders one sample chart of each kind into ./chart_output for a quick
/// visual check of the chart builders.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let output_dir = "chart_output";
    std::fs::create_dir_all(output_dir)?;

    let regions = ["north", "south", "east", "west"];
    let rows: Vec<Vec<Value>> = (0..60)
        .map(|i| {
            let v = 40.0 + 30.0 * ((i as f64) * 0.35).sin() + (i % 7) as f64;
            vec![
                Value::Number(v),
                Value::Text(regions[i % regions.len()].to_string()),
            ]
        })
        .collect();
    let table = Table::new(vec!["revenue".into(), "region".into()], rows);

    let outputs = [
        ("bar", charts::bar_chart(&table, "revenue")?),
        ("line", charts::line_chart(&table, "revenue")?),
        ("histogram", charts::histogram(&table, "revenue")?),
        ("pie", charts::pie_chart(&table, "region", "revenue")?),
    ];

    for (name, png) in outputs {
        let path = format!("{}/{}.png", output_dir, name);
        std::fs::write(&path, &png)?;
        println!("wrote {} ({} bytes)", path, png.len());
    }

    Ok(())
}
