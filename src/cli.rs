use indicatif::ProgressBar;
use inquire::{CustomType, InquireError, Select};
use std::time::Duration;
use tcg_collection::{CollectionEntry, CollectionError, CollectionTracker, Selection};

fn entry_label(entry: &CollectionEntry) -> String {
    format!(
        "#{} {} [{}] x{}",
        entry.collection_number,
        entry.card.name,
        entry.rarity().unwrap_or("-"),
        entry.quantity
    )
}

pub async fn choose_expansion(tracker: &CollectionTracker) -> Result<(), CollectionError> {
    let catalog = tracker.catalog();
    let active = tracker.active_expansion();
    let expansion_labels: Vec<String> = catalog
        .iter()
        .map(|exp| {
            let marker = if active.as_deref() == Some(exp.id.as_str()) { "*" } else { " " };
            format!("{} {} - {}", marker, exp.label(), exp.series)
        })
        .collect();

    let select_ans: Result<String, InquireError> =
        Select::new("Select an expansion:", expansion_labels.clone()).prompt();

    let Ok(label) = select_ans else {
        println!("Failed to select an expansion.");
        return Ok(());
    };
    let Some(expansion) = expansion_labels
        .iter()
        .position(|l| *l == label)
        .and_then(|i| catalog.iter().nth(i))
    else {
        println!("Expansion not found.");
        return Ok(());
    };

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("Loading {}...", expansion.name));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let selection = tracker.select(&expansion.id).await;
    spinner.finish_and_clear();

    match selection? {
        Selection::Unchanged => println!("{} is already selected.", expansion.name),
        Selection::Loaded { entries } => println!("Loaded {} cards from {}.", entries, expansion.name),
        Selection::Superseded => println!("Selection changed while loading."),
    }
    Ok(())
}

pub async fn refresh(tracker: &CollectionTracker) -> Result<(), CollectionError> {
    match tracker.refresh().await? {
        Some(Selection::Loaded { entries }) => println!("Reloaded {} cards.", entries),
        Some(_) => println!("Selection changed while reloading."),
        None => println!("No expansion selected."),
    }
    Ok(())
}

pub fn show_collection(tracker: &CollectionTracker) {
    let entries = tracker.entries();
    if entries.is_empty() {
        println!("No cards loaded.");
        return;
    }
    for entry in &entries {
        println!(
            "{:>4} | {:<32} | {:<10} | {:<14} | {:<28} | {:>3}",
            entry.collection_number,
            entry.card.name,
            entry.card.supertype,
            if entry.card.types.is_empty() { "N/A".to_string() } else { entry.card.types.join(", ") },
            entry.rarity().unwrap_or("Common"),
            entry.quantity
        );
    }
}

pub async fn adjust_quantity(tracker: &CollectionTracker) -> Result<(), CollectionError> {
    let entries = tracker.entries();
    if entries.is_empty() {
        println!("No cards loaded.");
        return Ok(());
    }
    let labels: Vec<String> = entries.iter().map(entry_label).collect();

    let card_ans: Result<String, InquireError> =
        Select::new("Select a card:", labels.clone()).prompt();
    let Some(entry) = card_ans
        .ok()
        .and_then(|label| labels.iter().position(|l| *l == label))
        .map(|i| &entries[i])
    else {
        println!("Failed to select a card.");
        return Ok(());
    };

    let delta_ans: Result<i32, InquireError> = CustomType::<i32>::new("Change (e.g. 1 or -1):")
        .with_default(1)
        .prompt();
    let Ok(delta) = delta_ans else {
        println!("Invalid change.");
        return Ok(());
    };

    let adjustment = tracker.adjust(entry.card_id(), delta).await?;
    println!(
        "{}: {} -> {}",
        entry.card.name, adjustment.previous, adjustment.quantity
    );
    if adjustment.superseded {
        println!("The collection was reloaded meanwhile; showing the reloaded quantity.");
    }
    Ok(())
}

pub async fn show_dashboard(tracker: &CollectionTracker) -> Result<(), CollectionError> {
    let spinner = ProgressBar::new_spinner();
    spinner.set_message("Loading dashboard...");
    spinner.enable_steady_tick(Duration::from_millis(100));
    let dashboard = tracker.dashboard().await;
    spinner.finish_and_clear();
    let dashboard = dashboard?;

    println!("Total cards: {}", dashboard.total_cards);
    println!("Expansions collected: {}", dashboard.total_expansions);
    for row in &dashboard.cards_by_expansion {
        println!("  {:<32} {:>5}", row.expansion_name, row.card_count);
    }
    Ok(())
}

pub fn show_stats(tracker: &CollectionTracker) {
    let stats = tracker.stats();
    let Some(expansion_id) = tracker.loaded_expansion() else {
        println!("No expansion loaded.");
        return;
    };
    let name = tracker
        .catalog()
        .get(&expansion_id)
        .map(|exp| exp.name.clone())
        .unwrap_or(expansion_id);

    println!("{}", name);
    println!("Total owned: {} ({} collected)", stats.total, stats.completion);
    for (rarity, count) in &stats.rarities {
        let completion = stats
            .rarity_completion
            .get(rarity)
            .map(|c| c.to_string())
            .unwrap_or_default();
        println!("  {:<28} {:>4}  {}", rarity, count, completion);
    }
    if stats.unlabelled() > 0 {
        println!("  {:<28} {:>4}", "(no rarity)", stats.unlabelled());
    }
}
