use airfield_core::date::{format_display, format_display_instant};
use airfield_core::status::SmartStatus;
use airfield_core::task::{CmTask, PpmTask};
use unicode_segmentation::UnicodeSegmentation;

const DESCRIPTION_WIDTH: usize = 40;

pub fn ppm_table(tasks: &[&PpmTask], status_of: impl Fn(&PpmTask) -> SmartStatus) {
    println!("ID | Status | Due | Shift | Type | Frequency | Description | Photos");
    println!("-- | ------ | --- | ----- | ---- | --------- | ----------- | ------");
    for task in tasks {
        println!(
            "{} | {} | {} | {} | {} | {} | {} | {}",
            task.id,
            status_of(*task),
            format_display(task.due_date),
            dash(&task.shift_type),
            dash(&task.task_type),
            task.frequency.map_or("-", |f| f.as_str()),
            clip(&task.description),
            task.photos.len()
        );
    }
}

pub fn cm_table(tasks: &[&CmTask]) {
    println!("ID | WO | Status | Priority | Reported | Location | Assigned | Description");
    println!("-- | -- | ------ | -------- | -------- | -------- | -------- | -----------");
    for task in tasks {
        println!(
            "{} | {} | {} | {} {} | {} | {} | {} | {}",
            task.id,
            dash(&task.work_order),
            task.status,
            task.priority.glyph(),
            task.priority,
            format_display(task.date_reported),
            dash(&task.location),
            dash(&task.assigned_to),
            clip(&task.description)
        );
    }
}

pub fn history_table(tasks: &[&PpmTask]) {
    println!("Completed | ID | Description | Next due");
    println!("--------- | -- | ----------- | --------");
    for task in tasks {
        let completed = task
            .last_completed
            .map_or_else(|| "-".to_owned(), format_display_instant);
        println!(
            "{completed} | {} | {} | {}",
            task.id,
            clip(&task.description),
            format_display(task.due_date)
        );
    }
}

fn dash(value: &str) -> &str {
    if value.trim().is_empty() { "-" } else { value }
}

fn clip(text: &str) -> String {
    let graphemes: Vec<&str> = text.graphemes(true).collect();
    if graphemes.len() <= DESCRIPTION_WIDTH {
        return text.to_owned();
    }
    format!("{}…", graphemes[..DESCRIPTION_WIDTH - 1].concat())
}
