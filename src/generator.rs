// ==========================================
// 履约中心人力分配系统 - 模拟订单生成
// ==========================================
// 件数 ~ Poisson(λ), 下限 1
// 单件重量 ~ Normal(μ, σ), 下限 min_weight_per_item
// 总重量 = 件数 × 单件重量, 保留 2 位小数
// 脏数据: 一组订单件数置空, 另一组订单重量取负
// ==========================================

use crate::config::pipeline_config::GeneratorConfig;
use crate::domain::order::RawOrderRecord;
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::columns;
use rand::rngs::StdRng;
use rand::seq::index;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal, Poisson};
use std::path::Path;
use tracing::info;

pub struct OrderGenerator {
    config: GeneratorConfig,
}

impl OrderGenerator {
    pub fn new(config: GeneratorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    fn validate(&self) -> ImportResult<()> {
        let c = &self.config;
        if !(c.mean_items > 0.0 && c.mean_items.is_finite()) {
            return Err(ImportError::InvalidGeneratorConfig(format!(
                "件数均值必须为正数: {}",
                c.mean_items
            )));
        }
        if !(c.weight_std_per_item >= 0.0 && c.weight_std_per_item.is_finite()) {
            return Err(ImportError::InvalidGeneratorConfig(format!(
                "重量标准差必须非负: {}",
                c.weight_std_per_item
            )));
        }
        if !(0.0..=0.5).contains(&c.corruption_rate) {
            return Err(ImportError::InvalidGeneratorConfig(format!(
                "脏数据比例必须在 [0, 0.5] 内: {}",
                c.corruption_rate
            )));
        }
        Ok(())
    }

    /// 生成原始订单 (同一种子结果确定)
    pub fn generate(&self) -> ImportResult<Vec<RawOrderRecord>> {
        self.validate()?;
        let c = &self.config;

        let mut rng = StdRng::seed_from_u64(c.seed);
        let items_dist = Poisson::new(c.mean_items)
            .map_err(|e| ImportError::InvalidGeneratorConfig(e.to_string()))?;
        let weight_dist = Normal::new(c.weight_mean_per_item, c.weight_std_per_item)
            .map_err(|e| ImportError::InvalidGeneratorConfig(e.to_string()))?;

        let mut records: Vec<RawOrderRecord> = (0..c.order_count)
            .map(|idx| {
                let items = (items_dist.sample(&mut rng) as u32).max(1);
                let per_item = weight_dist.sample(&mut rng).max(c.min_weight_per_item);
                let weight = (items as f64 * per_item * 100.0).round() / 100.0;
                RawOrderRecord {
                    row_number: idx + 2,
                    order_id: idx as i64 + 1,
                    num_items: Some(items),
                    total_weight_kg: weight,
                    arrival_timestamp: None,
                }
            })
            .collect();

        // 两组互不相交的脏数据
        let corrupt = ((c.order_count as f64 * c.corruption_rate).round() as usize).min(c.order_count / 2);
        if corrupt > 0 {
            let picked = index::sample(&mut rng, c.order_count, corrupt * 2);
            for (n, idx) in picked.iter().enumerate() {
                if n < corrupt {
                    records[idx].num_items = None;
                } else {
                    records[idx].total_weight_kg = -records[idx].total_weight_kg;
                }
            }
        }

        info!(
            order_count = records.len(),
            corrupted_per_kind = corrupt,
            seed = c.seed,
            "模拟订单生成完成"
        );
        Ok(records)
    }

    /// 生成并写出原始 CSV (空单元格 = NULL)
    pub fn write_csv(&self, path: &Path) -> ImportResult<Vec<RawOrderRecord>> {
        let records = self.generate()?;
        write_raw_orders_csv(path, &records)?;
        info!(path = %path.display(), "原始订单 CSV 写出完成");
        Ok(records)
    }
}

/// 写出原始订单 CSV
pub fn write_raw_orders_csv(path: &Path, records: &[RawOrderRecord]) -> ImportResult<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| ImportError::FileWriteError(e.to_string()))?;
        }
    }

    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record([columns::ORDER_ID, columns::NUM_ITEMS, columns::TOTAL_WEIGHT_KG])?;
    for record in records {
        writer.write_record([
            record.order_id.to_string(),
            record.num_items.map(|n| n.to_string()).unwrap_or_default(),
            record.total_weight_kg.to_string(),
        ])?;
    }
    writer
        .flush()
        .map_err(|e| ImportError::FileWriteError(e.to_string()))?;
    Ok(())
}
