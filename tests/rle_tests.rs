use std::collections::HashMap;
use std::collections::HashSet;

use quadlife::hashlife::Universe;
use quadlife::parse_rle;
use quadlife::rule_set::B3S23;
use quadlife::rule_set::RuleSet;

type Cells = HashSet<(i64, i64)>;

fn read_pattern(name: &str) -> anyhow::Result<Vec<u8>> {
    Ok(std::fs::read(format!("tests/rle_pats/{name}"))?)
}

/// Cell by cell reference simulation.
fn naive_run(rule: RuleSet, mut cells: Cells, generations: u64) -> Cells {
    for _ in 0..generations {
        let mut counts: HashMap<(i64, i64), u8> = HashMap::new();

        for &(x, y) in &cells {
            for dy in -1..=1 {
                for dx in -1..=1 {
                    if (dx, dy) != (0, 0) {
                        *counts.entry((x + dx, y + dy)).or_default() += 1;
                    }
                }
            }
        }

        cells = counts
            .into_iter()
            .filter(|&(c, n)| rule.next_state(cells.contains(&c), n))
            .map(|(c, _)| c)
            .collect();
    }

    cells
}

fn assert_matches(universe: &Universe, expected: &Cells) {
    assert_eq!(universe.population(), expected.len() as u64);

    for &(x, y) in expected {
        assert_eq!(universe.get(x, y), 1, "({x}, {y}) should be alive");
    }
}

fn pattern_cells(bytes: &[u8]) -> anyhow::Result<Cells> {
    let mut cells = Cells::new();
    parse_rle::read_rle(bytes, |x, y| {
        cells.insert((x, y));
    })?;

    Ok(cells)
}

#[test]
fn test_patterns() -> anyhow::Result<()> {
    let pattern_dir = std::fs::read_dir("tests/rle_pats")?;
    let mut tested = 0;
    let mut failed = Vec::new();

    for entry in pattern_dir {
        let path = entry?.path();
        let bytes = std::fs::read(&path)?;

        match parse_rle::read_rle(&bytes, |_x, _y| {}) {
            Ok(_) => tested += 1,
            Err(e) => failed.push((path.clone(), e)),
        }
    }

    if !failed.is_empty() {
        for (path, err) in &failed {
            eprintln!("Failed to parse {:?}: {:#}", path, err);
        }

        panic!(
            "{}/{} patterns failed to parse",
            failed.len(),
            tested + failed.len()
        );
    }

    assert!(tested >= 5);
    println!("Successfully parsed {} RLE patterns", tested);

    Ok(())
}

#[test]
fn gun_metadata_and_cells() -> anyhow::Result<()> {
    let bytes = read_pattern("gosper_glider_gun.rle")?;

    let mut cells = Vec::new();
    let file = parse_rle::read_rle(&bytes, |x, y| cells.push((x, y)))?;

    assert_eq!(file.name, Some(b"Gosper glider gun".as_slice()));
    assert_eq!(file.author, Some(b"Bill Gosper".as_slice()));
    assert_eq!(file.comments.len(), 2);
    assert_eq!(file.size, Some((36, 9)));
    assert_eq!(file.rule, Some(B3S23));
    assert_eq!(cells.len(), 36);

    // the pattern is centered on the origin
    let xs = cells.iter().map(|&(x, _)| x);
    let ys = cells.iter().map(|&(_, y)| y);
    assert_eq!(xs.clone().min(), Some(-18));
    assert_eq!(xs.max(), Some(17));
    assert_eq!(ys.clone().min(), Some(-4));
    assert_eq!(ys.max(), Some(4));

    Ok(())
}

#[test]
fn load_grows_the_root() -> anyhow::Result<()> {
    let bytes = read_pattern("gosper_glider_gun.rle")?;

    let mut universe = Universe::new(2)?;
    universe.load_rle(&bytes)?;

    assert_eq!(universe.population(), 36);
    assert_eq!(universe.level(), 6);
    assert_eq!(universe.get(-18, 0), 1);
    assert_eq!(universe.generation(), 0);

    Ok(())
}

#[test]
fn gun_fires_gliders() -> anyhow::Result<()> {
    let bytes = read_pattern("gosper_glider_gun.rle")?;

    let mut universe = Universe::new(3)?;
    universe.load_rle(&bytes)?;

    let mut elapsed = 0;
    while elapsed < 120 {
        elapsed += universe.step(3)?;
    }

    let expected = naive_run(B3S23, pattern_cells(&bytes)?, elapsed);
    assert_matches(&universe, &expected);

    // the gun is back in its first phase, with gliders on top
    assert_eq!(elapsed % 30, 0);
    assert!(universe.population() > 36);

    Ok(())
}

#[test]
fn offsets_are_honored() -> anyhow::Result<()> {
    let bytes = read_pattern("r_pentomino.rle")?;

    let mut universe = Universe::new(3)?;
    let file = universe.load_rle(&bytes)?;

    assert_eq!(file.offset, Some((-1, -1)));
    assert_eq!(file.rule, None);
    assert_eq!(universe.rule(), B3S23);

    let live: HashSet<_> = [(0, -1), (1, -1), (-1, 0), (0, 0), (0, 1)]
        .into_iter()
        .collect();

    for y in -4..4 {
        for x in -4..4 {
            assert_eq!(universe.get(x, y) == 1, live.contains(&(x, y)), "({x}, {y})");
        }
    }

    Ok(())
}

#[test]
fn file_rule_is_adopted() -> anyhow::Result<()> {
    let bytes = read_pattern("highlife_replicator.rle")?;

    let mut universe = Universe::new(3)?;
    universe.load_rle(&bytes)?;

    let highlife: RuleSet = "B36/S23".parse()?;
    assert_eq!(universe.rule(), highlife);
    assert_eq!(universe.population(), 12);

    let mut elapsed = 0;
    while elapsed < 48 {
        elapsed += universe.step(2)?;
    }

    let expected = naive_run(highlife, pattern_cells(&bytes)?, elapsed);
    assert_matches(&universe, &expected);

    Ok(())
}
