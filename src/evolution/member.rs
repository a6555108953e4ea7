//! Population members: genomes plus the mox built from them.

use crate::engine::{EngineFactory, EngineSpec};
use crate::genetics::{Gene, GenomeError, InstinctGenome, MutationRates, ParmGenome};
use crate::mox::{Mox, MoxId, Pose, Species};
use crate::textio::{FormatError, LineReader};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::io;
use std::sync::Arc;

pub const NUM_INSTINCTS: &str = "NUM_INSTINCTS";
pub const MAX_INSTINCTS: i32 = 5;

/// One candidate of a population
#[derive(Debug)]
pub struct Member {
    pub species: Species,
    pub generation: u32,
    pub fitness: f64,
    pub parms: ParmGenome,
    pub num_instincts: Gene,
    pub instincts: Vec<InstinctGenome>,
    pub mox: Mox,
}

impl Member {
    pub fn info(&self) -> String {
        format!(
            "mox={}, species={}, generation={}, fitness={:.4}, instincts={}",
            self.mox.id,
            self.species,
            self.generation,
            self.fitness,
            self.instincts.len()
        )
    }

    /// Info line followed by every genome
    pub fn properties(&self) -> String {
        let mut out = self.info();
        out.push_str("\nparameters:\n");
        out.push_str(&self.parms.genome().to_string());
        for (i, instinct) in self.instincts.iter().enumerate() {
            let _ = writeln!(out, "instinct {}:", i);
            out.push_str(&instinct.genome().to_string());
        }
        out
    }

    /// Snapshot for a checkpoint
    pub fn to_record(&self) -> io::Result<MemberRecord> {
        let mut mox = Vec::new();
        self.mox.write(&mut mox)?;
        let mox = String::from_utf8(mox).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(MemberRecord {
            species: self.species,
            generation: self.generation,
            fitness: self.fitness,
            parms: self.parms.clone(),
            num_instincts: self.num_instincts.clone(),
            instincts: self.instincts.clone(),
            mox,
        })
    }

    /// Rebuild a member, loading the mox and its engine state through
    /// `factory`.
    pub fn from_record(record: MemberRecord, factory: &dyn EngineFactory) -> Result<Self, FormatError> {
        let mox = Mox::read(&mut LineReader::new(record.mox.as_bytes()), factory)?;
        if mox.species != record.species {
            return Err(FormatError::invalid("species", mox.species));
        }
        Ok(Self {
            species: record.species,
            generation: record.generation,
            fitness: record.fitness,
            parms: record.parms,
            num_instincts: record.num_instincts,
            instincts: record.instincts,
            mox,
        })
    }
}

/// Serialized form of a [`Member`]. Genomes keep their random streams; the
/// mox is stored as its text record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MemberRecord {
    pub species: Species,
    pub generation: u32,
    pub fitness: f64,
    pub parms: ParmGenome,
    pub num_instincts: Gene,
    pub instincts: Vec<InstinctGenome>,
    pub mox: String,
}

/// Builds fresh, mutant and offspring members and hands out mox ids.
pub struct Breeder {
    rates: MutationRates,
    max_sensor_range: f32,
    factory: Arc<dyn EngineFactory>,
    next_id: MoxId,
}

impl Breeder {
    pub fn new(rates: MutationRates, max_sensor_range: f32, factory: Arc<dyn EngineFactory>) -> Self {
        Self {
            rates,
            max_sensor_range,
            factory,
            next_id: 0,
        }
    }

    pub fn factory(&self) -> &dyn EngineFactory {
        self.factory.as_ref()
    }

    pub fn next_id(&self) -> MoxId {
        self.next_id
    }

    pub fn set_next_id(&mut self, id: MoxId) {
        self.next_id = id;
    }

    fn instinct_count(gene: &Gene) -> usize {
        gene.as_int().unwrap_or(0).max(0) as usize
    }

    fn instinct_gene<R: Rng>(&self, rng: &mut R) -> Gene {
        Gene::int(NUM_INSTINCTS, 0, 0, MAX_INSTINCTS, 1, self.rates, rng.gen())
    }

    /// A generation-zero member with random genomes
    pub fn fresh<R: Rng>(&mut self, species: Species, pose: Pose, rng: &mut R) -> Member {
        let parms = ParmGenome::new(self.rates, rng.gen());
        let num_instincts = self.instinct_gene(rng);
        let instincts = (0..Self::instinct_count(&num_instincts))
            .map(|_| InstinctGenome::new(self.rates, self.max_sensor_range, rng.gen()))
            .collect();
        self.assemble(species, 0, parms, num_instincts, instincts, pose, rng)
    }

    /// Copy `parent` and mutate every genome, including the instinct count.
    /// Instincts beyond the parent's count start out random.
    pub fn mutant<R: Rng>(&mut self, parent: &Member, rng: &mut R) -> Result<Member, GenomeError> {
        let mut parms = ParmGenome::new(self.rates, rng.gen());
        parms.copy_values(&parent.parms)?;
        parms.mutate()?;

        let mut num_instincts = self.instinct_gene(rng);
        num_instincts.copy_value(&parent.num_instincts)?;
        num_instincts.mutate();

        let mut instincts = Vec::with_capacity(Self::instinct_count(&num_instincts));
        for i in 0..Self::instinct_count(&num_instincts) {
            let mut instinct = InstinctGenome::new(self.rates, self.max_sensor_range, rng.gen());
            if let Some(inherited) = parent.instincts.get(i) {
                instinct.copy_values(inherited)?;
                instinct.mutate();
            }
            instincts.push(instinct);
        }

        Ok(self.assemble(
            parent.species,
            parent.generation + 1,
            parms,
            num_instincts,
            instincts,
            parent.mox.origin_pose,
            rng,
        ))
    }

    /// Meld the parameter genomes of `a` and `b`. The instincts and the
    /// origin pose come whole from one parent chosen by a coin flip.
    pub fn offspring<R: Rng>(&mut self, a: &Member, b: &Member, rng: &mut R) -> Result<Member, GenomeError> {
        let mut parms = ParmGenome::new(self.rates, rng.gen());
        parms.meld_values(&a.parms, &b.parms)?;

        let winner = if rng.gen_bool(0.5) { a } else { b };
        let mut num_instincts = self.instinct_gene(rng);
        num_instincts.copy_value(&winner.num_instincts)?;
        let mut instincts = Vec::with_capacity(winner.instincts.len());
        for inherited in &winner.instincts {
            let mut instinct = InstinctGenome::new(self.rates, self.max_sensor_range, rng.gen());
            instinct.copy_values(inherited)?;
            instincts.push(instinct);
        }

        Ok(self.assemble(
            a.species,
            a.generation.max(b.generation) + 1,
            parms,
            num_instincts,
            instincts,
            winner.mox.origin_pose,
            rng,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble<R: Rng>(
        &mut self,
        species: Species,
        generation: u32,
        parms: ParmGenome,
        num_instincts: Gene,
        instincts: Vec<InstinctGenome>,
        pose: Pose,
        rng: &mut R,
    ) -> Member {
        let spec = EngineSpec::new(Species::BASE_NEEDS + instincts.len(), rng.gen()).with_params(parms.key_values());
        let engine = self.factory.create(&spec);
        let goals: Vec<_> = instincts.iter().map(InstinctGenome::extract).collect();
        let mox = Mox::new(self.next_id, species, pose, engine).with_instincts(&goals);
        self.next_id += 1;
        Member {
            species,
            generation,
            fitness: 0.0,
            parms,
            num_instincts,
            instincts,
            mox,
        }
    }
}
