/// Reorder channels so every sample shares one interleave order
use crate::error::{AudioError, Result};
use earmark_core::{ChannelLayout, Sample};

/// For each slot of `target`, the slot in `reference` holding the same role
///
/// Duplicate roles (e.g. several unknown channels) are matched in order.
fn permutation(reference: &ChannelLayout, target: &ChannelLayout) -> Option<Vec<usize>> {
    if reference.len() != target.len() {
        return None;
    }
    let mut taken = vec![false; reference.len()];
    target
        .roles()
        .iter()
        .map(|role| {
            let slot = reference
                .roles()
                .iter()
                .enumerate()
                .position(|(i, r)| !taken[i] && r == role)?;
            taken[slot] = true;
            Some(slot)
        })
        .collect()
}

/// Rewrite `target` so its channel order matches `reference`
///
/// Afterwards `target.layout() == reference.layout()`. Samples that already
/// agree are left untouched.
///
/// # Errors
/// [`AudioError::ChannelRoleMismatch`] when the two layouts do not name the
/// same roles.
pub fn reconcile_layout(reference: &Sample, target: &mut Sample) -> Result<()> {
    if reference.layout() == target.layout() {
        return Ok(());
    }
    let mismatch = || AudioError::ChannelRoleMismatch {
        reference_path: reference.path().to_path_buf(),
        reference: reference.layout().to_string(),
        target_path: target.path().to_path_buf(),
        target: target.layout().to_string(),
    };
    let map = permutation(reference.layout(), target.layout()).ok_or_else(mismatch)?;

    tracing::info!(
        "{}: reordering channels {} -> {}",
        target.name(),
        target.layout(),
        reference.layout()
    );

    let bps = target.format().bytes();
    let bpf = target.bytes_per_frame();
    let mut scratch = vec![0u8; bpf];
    for frame in target.data_mut().chunks_exact_mut(bpf) {
        for (from, &to) in map.iter().enumerate() {
            scratch[to * bps..(to + 1) * bps].copy_from_slice(&frame[from * bps..(from + 1) * bps]);
        }
        frame.copy_from_slice(&scratch);
    }
    target.set_layout(reference.layout().clone())?;
    Ok(())
}
