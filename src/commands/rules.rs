//! Rules command implementation.
//!
//! Lists the active region classification rules, or classifies one name.

use crate::process::classifier::RegionClassifier;

/// Prints the suffix and prefix tables in evaluation order.
pub fn command_rules(classifier: &RegionClassifier, name: Option<&str>, inode: u64) -> anyhow::Result<()> {
    if let Some(name) = name {
        println!("{}", classifier.classify(name, inode));
        return Ok(());
    }

    println!("📊 Herakles Memory Report - Region Classification Rules");
    println!("=======================================================");

    println!("\n🏷️  Suffix rules (checked first)");
    println!("{}", "─".repeat(50));
    for rule in classifier.suffix_rules() {
        println!("   ├─ {:<28} → {}", rule.pattern, rule.label);
    }

    println!("\n🏷️  Prefix rules");
    println!("{}", "─".repeat(50));
    for rule in classifier.prefix_rules() {
        println!("   ├─ {:<28} → {}", rule.pattern, rule.label);
    }

    println!(
        "\n📋 Total: {} suffix and {} prefix rules",
        classifier.suffix_rules().len(),
        classifier.prefix_rules().len()
    );

    Ok(())
}
