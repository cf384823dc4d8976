use pomocycle_core::Database;

pub fn run(all: bool, recent: Option<usize>) -> Result<(), Box<dyn std::error::Error>> {
    let db = Database::open()?;

    if let Some(limit) = recent {
        let phases = db.recent_phases(limit)?;
        println!("{}", serde_json::to_string_pretty(&phases)?);
        return Ok(());
    }

    let stats = if all {
        db.stats_all()?
    } else {
        db.stats_today(chrono::Utc::now())?
    };
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
