use vertica_k8s_admission::crd::ResourceKind;

fn main() -> anyhow::Result<()> {
    for kind in ResourceKind::ALL {
        print!("---\n{}", serde_yaml::to_string(&kind.crd()?)?);
    }
    Ok(())
}
