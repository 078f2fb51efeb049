// ==========================================
// 地质数据导入 - 地质对象 Repository Trait
// ==========================================
// 职责: 定义导入流程消费的持久化接口（不包含实现）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::{GeoPoint, Line, Stratigraphy, Well, WellLog};
use crate::repository::error::RepositoryResult;

// ==========================================
// GeoStore Trait
// ==========================================
// 用途: 会话工厂（每次导入运行打开一个独立会话）
// 实现者: SqliteGeoStore
pub trait GeoStore: Send + Sync {
    /// 打开一个新的持久化会话
    ///
    /// 不同导入类型的运行各自持有独立会话，彼此之间没有原子性
    fn open_session(&self) -> RepositoryResult<Box<dyn GeoSession>>;
}

// ==========================================
// GeoSession Trait
// ==========================================
// 用途: 单次导入运行期间的数据访问
// 说明: 每次 save_* 调用完成即提交，取消导入不会回滚已提交记录
pub trait GeoSession: Send {
    /// 按名称获取或创建地层
    ///
    /// # 参数
    /// - name: 地层名称，空串表示无地层
    /// - age: 地层年代，< 0 表示未知（不会覆盖已有年代）
    ///
    /// # 返回
    /// - Ok(None): name 为空
    /// - Ok(Some(Stratigraphy)): 已有或新建的地层
    fn init_stratigraphy(&mut self, name: &str, age: f64) -> RepositoryResult<Option<Stratigraphy>>;

    /// 按 id 加载点（含属性）
    fn load_point(&mut self, id: i64) -> RepositoryResult<Option<GeoPoint>>;

    /// 新增或更新点（含属性），返回点 id
    fn save_point(&mut self, point: &mut GeoPoint) -> RepositoryResult<i64>;

    /// 按 id 加载折线（含点序列）
    fn load_line(&mut self, id: i64) -> RepositoryResult<Option<Line>>;

    /// 新增或更新折线，返回折线 id
    ///
    /// 已有折线的旧点全部删除后写入新点序列
    fn save_line(&mut self, line: &mut Line) -> RepositoryResult<i64>;

    /// 按井名加载钻井（含分层标记）
    fn load_well_by_name(&mut self, name: &str) -> RepositoryResult<Option<Well>>;

    /// 新增或更新钻井，返回钻井 id
    ///
    /// 已有钻井的旧标记全部删除后写入新标记集合（整体替换，不合并）
    fn save_well(&mut self, well: &mut Well) -> RepositoryResult<i64>;

    /// 加载指定钻井的全部测井曲线
    fn load_well_logs(&mut self, well_id: i64) -> RepositoryResult<Vec<WellLog>>;

    /// 新增或更新测井曲线（同深度值就地更新），返回曲线 id
    fn save_well_log(&mut self, log: &mut WellLog) -> RepositoryResult<i64>;

    /// 关闭会话
    fn close(&mut self) -> RepositoryResult<()>;
}
