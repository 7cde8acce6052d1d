/// Seed the three default funnels the dispenser hardware ships with.
/// Only seeds if no funnels exist yet (idempotent guard).
pub fn seed_default_funnels(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    let count: i64 = conn.query_row("SELECT COUNT(*) FROM funnels", [], |row| row.get(0))?;
    if count > 0 {
        return Ok(());
    }

    for name in ["Funnel 1", "Funnel 2", "Funnel 3"] {
        conn.execute(
            "INSERT INTO funnels (name, medication, capacity, is_configured) VALUES (?1, '', 0, 0)",
            rusqlite::params![name],
        )?;
    }

    Ok(())
}
