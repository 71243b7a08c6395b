// ABOUTME: Validate command implementation.
// ABOUTME: Summarizes a parsed plan; parsing already enforced consistency.

use deployer::config::Plan;

pub fn validate(plan: &Plan) {
    println!("Namespace: {}", plan.namespace);
    println!("Artifact: {}", plan.artifact);
    println!("Configurations: {}", plan.configurations.len());
    for def in &plan.configurations {
        let required = def.keys.iter().filter(|k| k.required).count();
        println!(
            "  {}/{}: {} key(s), {} required",
            def.kind,
            def.id,
            def.keys.len(),
            required
        );
    }
    println!("Steps: {}", plan.steps.len());
    println!("Plan is valid");
}
