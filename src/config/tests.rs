use super::*;

const MINIMAL: &str = r#"
space:
  ras: [0, 2, 0]
  nelea: 1
  neleb: 1
"#;

#[test]
fn test_minimal_config_defaults() {
    let config: Config = serde_yml::from_str::<Config>(MINIMAL).unwrap().with_defaults();
    assert_eq!(config.space.params(), SpaceParams::new([0, 2, 0], 1, 1, 0, 0));
    assert_eq!(config.model.hopping, Some(1.0));
    assert_eq!(config.model.interaction, Some(0.0));
    assert_eq!(config.nstate(), 1);
    assert_eq!(config.max_subspace(), 20);
    assert!(config.spin_adapt());
    assert_eq!(config.ranks(), 1);
    assert!(config.archive.is_none());
}

#[test]
fn test_partial_sections_keep_given_values() {
    let text = r#"
space:
  ras: [1, 3, 1]
  nelea: 2
  neleb: 2
  max_holes: 1
  max_particles: 1
model:
  interaction: 4.0
  one_body:
    - [0.0, -1.0]
    - [-1.0, 0.0]
solver:
  nstate: 3
  spin_adapt: false
parallel:
  ranks: 4
archive: out.yaml
"#;
    let config: Config = serde_yml::from_str::<Config>(text).unwrap().with_defaults();
    assert_eq!(config.space.params().max_holes, 1);
    assert_eq!(config.model.interaction, Some(4.0));
    assert_eq!(config.model.periodic, Some(false));
    assert_eq!(config.model.one_body.as_ref().map(Vec::len), Some(2));
    assert_eq!(config.nstate(), 3);
    assert_eq!(config.max_iter(), 100);
    assert!(!config.spin_adapt());
    assert_eq!(config.ranks(), 4);
    assert_eq!(config.archive.as_deref(), Some("out.yaml"));
}
