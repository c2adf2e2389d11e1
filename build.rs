use vergen_gitcl::{Build, Cargo, Emitter, Gitcl};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let build = Build::builder().build_timestamp(true).build();
    let cargo = Cargo::builder().build();
    let gitcl = Gitcl::builder().branch(true).sha(true).dirty(true).build();

    let mut emitter = Emitter::default();
    emitter.add_instructions(&build)?.add_instructions(&cargo)?;

    // Source tarballs have no git metadata; version.rs falls back to "unknown".
    if let Err(err) = emitter.add_instructions(&gitcl) {
        println!("cargo:warning=git metadata unavailable: {err}");
    }

    emitter.emit()?;
    Ok(())
}
