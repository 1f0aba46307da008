use std::collections::BTreeMap;

use arch::inst::Inst;

use crate::builder::InstMeta;
use crate::error::{BuildError, Error};
use crate::reloc::{BranchKind, Reloc, RelocKind};
use crate::symbol::Symbol;

const BRA_SIZE: i32 = 2;
const JMP_SIZE: i32 = 3;
const JML_SIZE: i32 = 4;

fn fits8(distance: i32) -> bool {
    (i8::MIN as i32..=i8::MAX as i32).contains(&distance)
}

/// Size of entry `index` under the current rel classification: undecided
/// branches contribute their currently-implied form, everything else its
/// intrinsic size.
fn entry_size(meta: &[InstMeta], rel: &BTreeMap<usize, i32>, index: usize) -> i32 {
    match &meta[index].branch {
        Some(branch) => match branch.kind {
            BranchKind::JumpLong => JML_SIZE,
            BranchKind::Always => {
                if fits8(rel[&index]) {
                    BRA_SIZE
                } else {
                    JMP_SIZE
                }
            }
        },
        None => meta[index].inst.size(meta[index].a_size, meta[index].xy_size) as i32,
    }
}

/// Signed distance of the branch at `source` to the entry at `target`.
/// Forward branches sum the entries strictly between the two; backward
/// branches sum the entries after the target up to and including the
/// branch itself, negated.
fn distance(
    meta: &[InstMeta],
    rel: &BTreeMap<usize, i32>,
    source: usize,
    target: usize,
) -> i32 {
    if target > source {
        (source + 1..target).map(|i| entry_size(meta, rel, i)).sum()
    } else {
        -(target + 1..=source).map(|i| entry_size(meta, rel, i)).sum::<i32>()
    }
}

/// Byte offset of entry `index` under the current rel classification.
fn byte_offset(meta: &[InstMeta], rel: &BTreeMap<usize, i32>, index: usize) -> i32 {
    (0..index).map(|i| entry_size(meta, rel, i)).sum()
}

/// Replace every branch relocation with a real instruction: `bra` when the
/// target is within signed-8-bit reach, otherwise `jmp`/`jml` with a
/// relocation against the enclosing function. Runs the short/long choice
/// to a fixed point; a branch that once shortens never grows back.
pub(crate) fn lower_branches(
    meta: &mut Vec<InstMeta>,
    labels: &[Option<usize>],
    own: Symbol,
) -> Result<(), Error> {
    let mut targets: BTreeMap<usize, usize> = BTreeMap::new();
    for (index, entry) in meta.iter().enumerate() {
        if let Some(branch) = &entry.branch {
            let target = labels[branch.target.index()]
                .ok_or(BuildError::UndefinedLabel(branch.target.index()))?;
            targets.insert(index, target);
        }
    }
    if targets.is_empty() {
        return Ok(());
    }

    // start from "everything long" and shrink until stable
    let mut rel: BTreeMap<usize, i32> = targets.keys().map(|&s| (s, i32::MAX)).collect();
    loop {
        let mut changed = false;
        for (&source, &target) in &targets {
            let dist = distance(meta, &rel, source, target);
            if !fits8(rel[&source]) && fits8(dist) {
                changed = true;
            }
            rel.insert(source, dist);
        }
        if !changed {
            break;
        }
    }

    for (&source, &target) in targets.iter().rev() {
        let target_offset = byte_offset(meta, &rel, target) as u16;
        let entry = &mut meta[source];
        let branch = match entry.branch.take() {
            Some(branch) => branch,
            None => continue,
        };
        match branch.kind {
            BranchKind::Always => {
                let dist = rel[&source];
                if fits8(dist) {
                    entry.inst = Inst::Bra(dist as i8);
                } else {
                    entry.inst = Inst::Jmp(0);
                    entry.reloc = Some(Reloc::with_offset(
                        RelocKind::Addr16,
                        own.clone(),
                        target_offset,
                    ));
                }
            }
            BranchKind::JumpLong => {
                entry.inst = Inst::Jml(0);
                entry.reloc = Some(Reloc::with_offset(
                    RelocKind::Addr24,
                    own.clone(),
                    target_offset,
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use arch::reg::SizeMode;

    use super::*;
    use crate::builder::Label;
    use crate::reloc::BranchReloc;

    fn plain(inst: Inst) -> InstMeta {
        InstMeta {
            inst,
            offset: 0,
            reloc: None,
            branch: None,
            a_size: SizeMode::S8,
            xy_size: SizeMode::S8,
            comments: Vec::new(),
        }
    }

    fn pending(kind: BranchKind, label: usize) -> InstMeta {
        let inst = match kind {
            BranchKind::Always => Inst::Bra(0),
            BranchKind::JumpLong => Inst::Jml(0),
        };
        InstMeta {
            branch: Some(BranchReloc {
                kind,
                target: Label(label),
            }),
            ..plain(inst)
        }
    }

    fn own() -> Symbol {
        Symbol::Addr(0)
    }

    #[test]
    fn backward_branch_to_adjacent_nop_is_short() {
        let mut meta = vec![plain(Inst::Nop), pending(BranchKind::Always, 0)];
        let labels = vec![Some(0)];
        lower_branches(&mut meta, &labels, own()).unwrap();
        assert_eq!(meta[1].inst, Inst::Bra(-2));
        assert!(meta[1].branch.is_none());
        assert!(meta[1].reloc.is_none());
    }

    #[test]
    fn forward_branch_skips_the_in_between_entries() {
        let mut meta = vec![
            pending(BranchKind::Always, 0),
            plain(Inst::Nop),
            plain(Inst::Nop),
            plain(Inst::Rts),
        ];
        let labels = vec![Some(3)];
        lower_branches(&mut meta, &labels, own()).unwrap();
        assert_eq!(meta[0].inst, Inst::Bra(2));
    }

    #[test]
    fn far_backward_branch_turns_into_jmp_with_reloc() {
        let mut meta = vec![plain(Inst::Nop)];
        for _ in 0..199 {
            meta.push(plain(Inst::Nop));
        }
        meta.push(pending(BranchKind::Always, 0));
        let labels = vec![Some(0)];
        lower_branches(&mut meta, &labels, own()).unwrap();
        assert_eq!(meta[200].inst, Inst::Jmp(0));
        let reloc = meta[200].reloc.as_ref().unwrap();
        assert_eq!(reloc.kind, RelocKind::Addr16);
        assert_eq!(reloc.offset, 0);
        assert!(meta[200].branch.is_none());
    }

    #[test]
    fn jump_long_is_always_the_long_form() {
        let mut meta = vec![plain(Inst::Nop), pending(BranchKind::JumpLong, 0)];
        let labels = vec![Some(0)];
        lower_branches(&mut meta, &labels, own()).unwrap();
        assert_eq!(meta[1].inst, Inst::Jml(0));
        let reloc = meta[1].reloc.as_ref().unwrap();
        assert_eq!(reloc.kind, RelocKind::Addr24);
        assert_eq!(reloc.offset, 0);
    }

    #[test]
    fn chained_branches_shorten_together() {
        // the first branch fits the short form only once the second one
        // has shortened: 119 nops + bra + 5 nops + rts = 127 bytes, but
        // 128 while the second branch is still assumed long
        let mut meta = Vec::new();
        meta.push(pending(BranchKind::Always, 0));
        for _ in 0..119 {
            meta.push(plain(Inst::Nop));
        }
        meta.push(pending(BranchKind::Always, 1));
        for _ in 0..5 {
            meta.push(plain(Inst::Nop));
        }
        meta.push(plain(Inst::Rts));
        // label 0 -> end of function, label 1 -> just past the second branch
        let labels = vec![Some(meta.len()), Some(121)];
        lower_branches(&mut meta, &labels, own()).unwrap();
        assert_eq!(meta[120].inst, Inst::Bra(0));
        assert_eq!(meta[0].inst, Inst::Bra(127));
    }

    #[test]
    fn undefined_label_is_an_error() {
        let mut meta = vec![pending(BranchKind::Always, 0)];
        let labels = vec![None];
        let err = lower_branches(&mut meta, &labels, own()).unwrap_err();
        assert!(matches!(
            err,
            Error::Build(BuildError::UndefinedLabel(0))
        ));
    }
}
