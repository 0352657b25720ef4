use crate::categorizer::categorize_transactions;
use crate::db;
use crate::error::Result;
use crate::settings::db_path;

pub fn run() -> Result<()> {
    let mut conn = db::open(&db_path())?;
    let pass = categorize_transactions(&mut conn)?;
    println!("{} categorized, {} still flagged", pass.categorized, pass.still_flagged);
    if pass.still_flagged > 0 {
        println!("Run `tally review` to categorize the rest by hand.");
    }
    Ok(())
}
