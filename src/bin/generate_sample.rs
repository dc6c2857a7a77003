//! Writes `sample_data.csv`: a week of 15-minute readings in the style of a
//! German logger export (semicolon-separated, decimal commas, Latin-1 text,
//! timestamps suffixed with "Uhr"), with a few dirty rows mixed in.

use chrono::{Duration, NaiveDate};

/// Minimal deterministic PRNG (xoshiro256**)
struct SimpleRng {
    state: [u64; 4],
}

impl SimpleRng {
    fn new(seed: u64) -> Self {
        let mut s = [0u64; 4];
        let mut x = seed;
        for slot in &mut s {
            x = x.wrapping_mul(6364136223846793005).wrapping_add(1);
            *slot = x;
        }
        SimpleRng { state: s }
    }

    fn next_u64(&mut self) -> u64 {
        let result = (self.state[1].wrapping_mul(5))
            .rotate_left(7)
            .wrapping_mul(9);
        let t = self.state[1] << 17;
        self.state[2] ^= self.state[0];
        self.state[3] ^= self.state[1];
        self.state[1] ^= self.state[2];
        self.state[0] ^= self.state[3];
        self.state[2] ^= t;
        self.state[3] = self.state[3].rotate_left(45);
        result
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Box-Muller transform for normal distribution
    fn gauss(&mut self, mean: f64, std_dev: f64) -> f64 {
        let u1 = self.next_f64().max(1e-15);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std_dev * z
    }
}

fn decimal_comma(v: f64) -> String {
    format!("{v:.2}").replace('.', ",")
}

fn main() -> anyhow::Result<()> {
    let mut rng = SimpleRng::new(42);
    let start = NaiveDate::from_ymd_opt(2024, 3, 4)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| anyhow::anyhow!("invalid start date"))?;

    let mut writer = csv::WriterBuilder::new()
        .delimiter(b';')
        .from_writer(Vec::new());
    writer.write_record(["Zeitstempel", "Temperatur °C", "Leistung kW", "Status"])?;

    let steps = 7 * 24 * 4;
    for i in 0..steps {
        let ts = start + Duration::minutes(15 * i as i64);
        let hour = i as f64 / 4.0 % 24.0;
        let daylight = (std::f64::consts::PI * (hour - 6.0) / 12.0).sin().max(0.0);

        let temp = 8.0 + 10.0 * daylight + rng.gauss(0.0, 0.4);
        let power = 50.0 * daylight + rng.gauss(0.0, 1.5).abs();

        let temp_cell = if i % 97 == 13 { "Sensorfehler".to_string() } else { decimal_comma(temp) };
        let power_cell = if i % 61 == 7 { String::new() } else { decimal_comma(power) };
        let status = if daylight > 0.0 { "Betrieb" } else { "Ruhe" };

        writer.write_record([
            format!("{} Uhr", ts.format("%d.%m.%Y %H:%M")),
            temp_cell,
            power_cell,
            status.to_string(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CSV: {}", e.error()))?;
    let text = String::from_utf8(bytes)?;
    let (latin1, _, had_errors) = encoding_rs::WINDOWS_1252.encode(&text);
    if had_errors {
        anyhow::bail!("sample text is not representable in Latin-1");
    }

    let output_path = "sample_data.csv";
    std::fs::write(output_path, &latin1)?;
    println!("Wrote {steps} rows to {output_path}");
    Ok(())
}
